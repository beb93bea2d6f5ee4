//! `buildparity digests` - dump the digest map of one archive.

use anyhow::Result;
use colored::Colorize;
use parity_core::{read_archive_digests, ArchiveDigests};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::process::ExitCode;

use super::Context;
use crate::cli::args::DigestsArgs;

#[derive(Serialize)]
struct DigestListing<'a> {
    entries: BTreeMap<&'a str, String>,
    excluded: &'a [parity_core::Exclusion],
}

pub fn execute(_ctx: Context, args: DigestsArgs) -> Result<ExitCode> {
    let digests = read_archive_digests(&args.archive)?;
    let mut stdout = std::io::stdout().lock();
    if args.json {
        write_json(&digests, &mut stdout)?;
    } else {
        write_text(&digests, &mut stdout)?;
    }
    Ok(ExitCode::SUCCESS)
}

fn write_text<W: Write>(digests: &ArchiveDigests, out: &mut W) -> Result<()> {
    for (id, record) in &digests.digests {
        writeln!(out, "{id} {record}")?;
    }

    if !digests.excluded.is_empty() {
        writeln!(out)?;
        writeln!(out, "{} ({})", "Excluded:".yellow().bold(), digests.excluded.len())?;
        for exclusion in &digests.excluded {
            writeln!(out, "  {exclusion}")?;
        }
    }
    Ok(())
}

fn write_json<W: Write>(digests: &ArchiveDigests, out: &mut W) -> Result<()> {
    let listing = DigestListing {
        entries: digests
            .digests
            .iter()
            .map(|(id, record)| (id.as_str(), record.to_string()))
            .collect(),
        excluded: &digests.excluded,
    };
    serde_json::to_writer_pretty(&mut *out, &listing)?;
    writeln!(out)?;
    Ok(())
}
