use std::path::Path;

use anyhow::Context;
use attr_buffer::{read_frame_with_limit, write_frame, FrameOptions};
use attr_tree::{diff_trees, with_global, DecodeContext, TreeAttribute, TreeChange, TreeDiff};
use colored::Colorize;
use tracing::{debug, warn};

use crate::cli::*;
use crate::config::CliConfig;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = CliConfig::load(cli.config.as_deref())?;
    match cli.command {
        Command::Inspect(args) => cmd_inspect(args, &config),
        Command::Hash(args) => cmd_hash(args, &config),
        Command::Diff(args) => cmd_diff(args, &config),
        Command::Subset(args) => cmd_subset(args, &config),
        Command::Merge(args) => cmd_merge(args, &config),
    }
}

/// Read and decode a framed snapshot.
pub fn read_snapshot(path: &Path, config: &CliConfig) -> anyhow::Result<TreeAttribute> {
    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let body = read_frame_with_limit(&data, config.max_body_len)
        .with_context(|| format!("unframing {}", path.display()))?;
    let tree = with_global(|registry| {
        let ctx = DecodeContext::new(registry).with_max_depth(config.max_depth);
        let tree = TreeAttribute::from_bytes_with(&body, &ctx);
        if let Some(level) = ctx.stopped_at() {
            warn!(path = %path.display(), level, "snapshot nests too deep; contents truncated");
        }
        tree
    })?
    .with_context(|| format!("decoding {}", path.display()))?;
    debug!(path = %path.display(), keys = tree.len(), "read snapshot");
    Ok(tree)
}

/// Encode and frame `tree` into `path`.
pub fn write_snapshot(path: &Path, tree: &TreeAttribute, compress: bool) -> anyhow::Result<()> {
    let body = tree.to_bytes()?;
    let options = if compress {
        FrameOptions::compressed()
    } else {
        FrameOptions::default()
    };
    let framed = write_frame(&body, &options)?;
    std::fs::write(path, &framed).with_context(|| format!("writing {}", path.display()))?;
    debug!(path = %path.display(), bytes = framed.len(), compress, "wrote snapshot");
    Ok(())
}

fn cmd_inspect(args: InspectArgs, config: &CliConfig) -> anyhow::Result<()> {
    let tree = read_snapshot(&args.file, config)?;
    println!("{} {} keys", args.file.display().to_string().bold(), tree.len());
    println!("{}", tree.to_text());
    if args.sorted {
        let digest = tree.sorted_copy(true).digest_hex()?;
        println!("  digest: {}", digest.cyan());
    }
    Ok(())
}

pub fn hash_snapshot(path: &Path, ignore: &[String], config: &CliConfig) -> anyhow::Result<u64> {
    let tree = read_snapshot(path, config)?;
    let ignore: Vec<&str> = ignore.iter().map(String::as_str).collect();
    Ok(tree.hash_code(&ignore))
}

fn cmd_hash(args: HashArgs, config: &CliConfig) -> anyhow::Result<()> {
    let hash = hash_snapshot(&args.file, &args.ignore, config)?;
    println!("{}", hex::encode(hash.to_be_bytes()).yellow());
    Ok(())
}

pub fn diff_snapshots(
    old: &Path,
    new: &Path,
    ignore: &[String],
    config: &CliConfig,
) -> anyhow::Result<TreeDiff> {
    let old = read_snapshot(old, config)?;
    let new = read_snapshot(new, config)?;
    let ignore: Vec<&str> = ignore.iter().map(String::as_str).collect();
    Ok(diff_trees(&old, &new, &ignore))
}

fn cmd_diff(args: DiffArgs, config: &CliConfig) -> anyhow::Result<()> {
    let diff = diff_snapshots(&args.old, &args.new, &args.ignore, config)?;
    if diff.is_empty() {
        println!("No changes.");
        return Ok(());
    }
    for change in &diff.changes {
        match change {
            TreeChange::Added { path, value } => {
                println!("{} {} = {}", "+".green().bold(), path, value.to_text())
            }
            TreeChange::Removed { path, value } => {
                println!("{} {} = {}", "-".red().bold(), path, value.to_text())
            }
            TreeChange::Modified { path, old, new } => println!(
                "{} {}: {} -> {}",
                "~".yellow().bold(),
                path,
                old.to_text(),
                new.to_text()
            ),
        }
    }
    println!(
        "{} added, {} removed, {} modified",
        diff.additions(),
        diff.removals(),
        diff.modifications()
    );
    Ok(())
}

pub fn is_subset(subset: &Path, superset: &Path, config: &CliConfig) -> anyhow::Result<bool> {
    let a = read_snapshot(subset, config)?;
    let b = read_snapshot(superset, config)?;
    Ok(a.is_subset_of_with(None, &b, &config.ignored_attributes))
}

fn cmd_subset(args: SubsetArgs, config: &CliConfig) -> anyhow::Result<()> {
    if is_subset(&args.subset, &args.superset, config)? {
        println!("{} {} is a subset", "✓".green().bold(), args.subset.display());
    } else {
        println!("{} {} is not a subset", "✗".red().bold(), args.subset.display());
    }
    Ok(())
}

pub fn merge_snapshots(
    dest: &Path,
    source: &Path,
    output: &Path,
    compress: bool,
    config: &CliConfig,
) -> anyhow::Result<TreeAttribute> {
    let mut tree = read_snapshot(dest, config)?;
    let source = read_snapshot(source, config)?;
    tree.merge(&source)
        .with_context(|| format!("merging into {}", dest.display()))?;
    write_snapshot(output, &tree, compress)?;
    Ok(tree)
}

fn cmd_merge(args: MergeArgs, config: &CliConfig) -> anyhow::Result<()> {
    let output = args.output.as_deref().unwrap_or(args.dest.as_path());
    let tree = merge_snapshots(
        &args.dest,
        &args.source,
        output,
        args.compress || config.compress,
        config,
    )?;
    println!(
        "{} Merged {} into {} ({} keys)",
        "✓".green().bold(),
        args.source.display(),
        output.display().to_string().bold(),
        tree.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use attr_tree::AttrError;
    use tempfile::TempDir;

    use super::*;

    fn snapshot(dir: &TempDir, name: &str, tree: &TreeAttribute) -> PathBuf {
        let path = dir.path().join(name);
        write_snapshot(&path, tree, false).unwrap();
        path
    }

    fn player() -> TreeAttribute {
        let mut tree = TreeAttribute::new();
        tree.set_int("hp", 20);
        tree.set_string("name", "Zara");
        tree.set_int_array("tags", vec![1, 2, 3]);
        tree
    }

    #[test]
    fn snapshot_roundtrip_plain_and_compressed() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig::default();
        for compress in [false, true] {
            let path = dir.path().join(format!("p{compress}.attr"));
            write_snapshot(&path, &player(), compress).unwrap();
            assert_eq!(read_snapshot(&path, &config).unwrap(), player());
        }
    }

    #[test]
    fn corrupt_snapshot_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = snapshot(&dir, "p.attr", &player());
        let mut bytes = std::fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        std::fs::write(&path, bytes).unwrap();
        assert!(read_snapshot(&path, &CliConfig::default()).is_err());
    }

    #[test]
    fn oversized_compressed_snapshot_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut big = TreeAttribute::new();
        big.set_bytes("blob", vec![0u8; 60_000]);
        let path = dir.path().join("big.attr");
        write_snapshot(&path, &big, true).unwrap();

        let tight = CliConfig {
            max_body_len: 1024,
            ..CliConfig::default()
        };
        let err = read_snapshot(&path, &tight).unwrap_err();
        assert!(matches!(
            err.root_cause().downcast_ref::<attr_buffer::BufferError>(),
            Some(attr_buffer::BufferError::DecompressedTooLarge { limit: 1024 })
        ));
        assert_eq!(read_snapshot(&path, &CliConfig::default()).unwrap(), big);
    }

    #[test]
    fn hash_ignores_requested_keys() {
        let dir = tempfile::tempdir().unwrap();
        let a = snapshot(&dir, "a.attr", &player());
        let mut other = player();
        other.set_int("hp", 1);
        let b = snapshot(&dir, "b.attr", &other);
        let config = CliConfig::default();

        assert_ne!(
            hash_snapshot(&a, &[], &config).unwrap(),
            hash_snapshot(&b, &[], &config).unwrap()
        );
        let ignore = vec!["hp".to_owned()];
        assert_eq!(
            hash_snapshot(&a, &ignore, &config).unwrap(),
            hash_snapshot(&b, &ignore, &config).unwrap()
        );
    }

    #[test]
    fn diff_reports_changes() {
        let dir = tempfile::tempdir().unwrap();
        let a = snapshot(&dir, "a.attr", &player());
        let mut changed = player();
        changed.set_int("hp", 15);
        changed.set_bool("alive", true);
        let b = snapshot(&dir, "b.attr", &changed);

        let diff = diff_snapshots(&a, &b, &[], &CliConfig::default()).unwrap();
        assert_eq!(diff.additions(), 1);
        assert_eq!(diff.modifications(), 1);
        let diff = diff_snapshots(&a, &b, &["hp".into()], &CliConfig::default()).unwrap();
        assert_eq!(diff.len(), 1);
    }

    #[test]
    fn subset_uses_configured_ignores() {
        let dir = tempfile::tempdir().unwrap();
        let mut small = TreeAttribute::new();
        small.set_int("hp", 20);
        small.set_double("temperature", 36.6);
        let a = snapshot(&dir, "a.attr", &small);
        let b = snapshot(&dir, "b.attr", &player());

        assert!(is_subset(&a, &b, &CliConfig::default()).unwrap());
        let strict = CliConfig {
            ignored_attributes: attr_tree::IgnoredAttributes::none(),
            ..CliConfig::default()
        };
        assert!(!is_subset(&a, &b, &strict).unwrap());
    }

    #[test]
    fn merge_writes_combined_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let dest = snapshot(&dir, "dest.attr", &player());
        let mut extra = TreeAttribute::new();
        extra.set_int("hp", 25);
        extra.get_or_add_tree("inv").set_int("slots", 9);
        let source = snapshot(&dir, "src.attr", &extra);
        let out = dir.path().join("out.attr");

        let config = CliConfig::default();
        merge_snapshots(&dest, &source, &out, true, &config).unwrap();
        let merged = read_snapshot(&out, &config).unwrap();
        assert_eq!(merged.get_int("hp"), Some(25));
        assert_eq!(merged.get_string("name"), Some("Zara"));
        assert_eq!(merged.get_tree("inv").unwrap().get_int("slots"), Some(9));
        assert_eq!(read_snapshot(&dest, &config).unwrap(), player());
    }

    #[test]
    fn conflicting_merge_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let dest = snapshot(&dir, "dest.attr", &player());
        let mut bad = TreeAttribute::new();
        bad.set_string("hp", "lots");
        let source = snapshot(&dir, "src.attr", &bad);
        let out = dir.path().join("out.attr");

        let err = merge_snapshots(&dest, &source, &out, false, &CliConfig::default()).unwrap_err();
        assert!(matches!(
            err.root_cause().downcast_ref::<AttrError>(),
            Some(AttrError::TypeMismatchOnMerge { .. })
        ));
        assert!(!out.exists());
    }

    #[test]
    fn depth_limit_from_config_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let mut tree = TreeAttribute::new();
        tree.set_by_path("a/b/c/d", 1).unwrap();
        let path = snapshot(&dir, "deep.attr", &tree);
        let shallow = CliConfig {
            max_depth: 2,
            ..CliConfig::default()
        };
        let decoded = read_snapshot(&path, &shallow).unwrap();
        assert!(decoded.get_by_path("a").is_some());
        assert!(decoded.get_by_path("a/b").is_none());
    }
}
