// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tessel_core::{QueryExpression, QueryResult};
use tracing::info;

use crate::cli::{CacheArgs, Cli, Commands, Format};
use crate::inputs::{build_cache, read_json, read_ops};
use crate::report::{records_table, verify_table, VerifyReport};

pub fn run(cli: Cli, out: &mut impl Write) -> Result<()> {
    let config_dir = cli.config_dir.as_deref();
    match cli.command {
        Commands::Apply { cache, ops } => apply(&cache, &ops, config_dir, out),
        Commands::Verify { cache, ops, json } => verify(&cache, &ops, json, config_dir, out),
        Commands::Query {
            cache,
            query,
            format,
        } => run_query(&cache, &query, format, config_dir, out),
    }
}

fn apply(
    args: &CacheArgs,
    ops: &Path,
    config_dir: Option<&Path>,
    out: &mut impl Write,
) -> Result<()> {
    let mut cache = build_cache(args, config_dir)?;
    let ops = read_ops(ops)?;
    let result = cache.patch(&ops).context("patch failed")?;
    info!(ops = ops.len(), inverse = result.inverse.len(), "batch applied");
    serde_json::to_writer_pretty(&mut *out, &result)?;
    writeln!(out)?;
    Ok(())
}

fn verify(
    args: &CacheArgs,
    ops: &Path,
    json: bool,
    config_dir: Option<&Path>,
    out: &mut impl Write,
) -> Result<()> {
    let mut cache = build_cache(args, config_dir)?;
    let ops = read_ops(ops)?;
    let before = cache.state_digest();
    let result = cache.patch(&ops).context("patch failed")?;
    let after = cache.state_digest();
    cache
        .patch(&result.inverse)
        .context("replaying the inverse failed")?;
    let restored = cache.state_digest();

    let report = VerifyReport {
        operations: ops.len(),
        inverse_operations: result.inverse.len(),
        digest_before: hex::encode(before),
        digest_after: hex::encode(after),
        digest_restored: hex::encode(restored),
        restored: before == restored,
    };
    if json {
        serde_json::to_writer_pretty(&mut *out, &report)?;
        writeln!(out)?;
    } else {
        writeln!(out, "{}", verify_table(&report))?;
    }
    if !report.restored {
        bail!(
            "inverse did not restore the state: expected {}, found {}",
            report.digest_before,
            report.digest_restored
        );
    }
    Ok(())
}

fn run_query(
    args: &CacheArgs,
    query: &Path,
    format: Format,
    config_dir: Option<&Path>,
    out: &mut impl Write,
) -> Result<()> {
    let cache = build_cache(args, config_dir)?;
    let expression: QueryExpression = read_json(query, "query")?;
    let result = cache.query(&expression).context("query failed")?;
    match format {
        Format::Json => {
            serde_json::to_writer_pretty(&mut *out, &result)?;
            writeln!(out)?;
        }
        Format::Table => {
            let records = match &result {
                QueryResult::Record(record) => record.iter().cloned().collect(),
                QueryResult::Records(records) => records.clone(),
            };
            writeln!(out, "{}", records_table(&records))?;
        }
    }
    Ok(())
}
