//! Lattice field layout inspector.
//!
//! Loads a lattice definition, lays out one field type on the lazy graph
//! backend and prints its shape, chunking and worker count as JSON.

mod report;

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use lattice_field::{
    expand, load_lattice_config, AxesOrder, ChunkSpec, Field, FieldTypeDescriptor, GraphBackend,
    LayoutConfig,
};
use report::LayoutReport;

#[derive(Parser, Debug)]
#[command(name = "field-inspector")]
#[command(about = "Inspect the memory layout of a lattice field")]
struct Args {
    /// Lattice definition file (YAML)
    #[arg(short, long, env = "LATTICE_FIELD_LATTICE")]
    lattice: String,

    /// Field type: a catalog name or a JSON descriptor
    #[arg(short, long, default_value = "vector")]
    field_type: String,

    /// Axes order, comma separated (default: expansion order)
    #[arg(long, value_delimiter = ',')]
    axes_order: Option<Vec<String>>,

    /// Chunk size of an axis, as name=size (repeatable)
    #[arg(long = "chunk", value_parser = parse_chunk)]
    chunks: Vec<(String, usize)>,

    /// Also list the first N candidate axes orders
    #[arg(long)]
    candidates: Option<usize>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level, args.json_logs)?;

    let layout = LayoutConfig::from_env();
    layout.validate().map_err(|e| anyhow!(e))?;

    let (lattice, catalog) = load_lattice_config(&args.lattice, &layout)
        .with_context(|| format!("loading lattice '{}'", args.lattice))?;
    info!(lattice = %args.lattice, volume = lattice.volume(), "Loaded lattice");

    let field_type = parse_field_type(&args.field_type)?;
    let chunk_spec = if args.chunks.is_empty() {
        let axes = expand(&field_type, &lattice, &catalog)?;
        layout.default_chunk_spec(&lattice, &axes)
    } else {
        args.chunks
            .iter()
            .fold(ChunkSpec::new(), |spec, (name, size)| spec.with(name.as_str(), *size))
    };

    let mut builder = Field::builder()
        .lattice(lattice)?
        .field_type(field_type)?
        .catalog(catalog)
        .chunks(chunk_spec);
    if let Some(order) = &args.axes_order {
        builder = builder.axes_order(AxesOrder::new(order.iter().cloned()));
    }
    let field = builder.build(Arc::new(GraphBackend::new()))?;

    let mut report = LayoutReport::from_field(&field)?;
    if let Some(requested) = args.candidates {
        let limit = requested.min(layout.max_order_candidates);
        report = report.with_candidates(&field, limit)?;
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // stdout carries the report
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

/// Parse a `name=size` chunk entry.
fn parse_chunk(s: &str) -> std::result::Result<(String, usize), String> {
    let (name, size) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=size, got '{s}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing axis name in '{s}'"));
    }
    let size = size
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("invalid chunk size in '{s}': {e}"))?;
    if size == 0 {
        return Err(format!("chunk size must be > 0 in '{s}'"));
    }
    Ok((name.to_string(), size))
}

/// A bare word names a catalog entry; anything starting with `[` or `{` is JSON.
fn parse_field_type(s: &str) -> Result<FieldTypeDescriptor> {
    let trimmed = s.trim();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        let value: serde_json::Value =
            serde_json::from_str(trimmed).context("parsing field type descriptor")?;
        Ok(FieldTypeDescriptor::from_value(&value)?)
    } else {
        Ok(FieldTypeDescriptor::name(trimmed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chunk() {
        assert_eq!(parse_chunk("t=2").unwrap(), ("t".to_string(), 2));
        assert_eq!(parse_chunk(" color = 3 ").unwrap(), ("color".to_string(), 3));
        assert!(parse_chunk("t").is_err());
        assert!(parse_chunk("=2").is_err());
        assert!(parse_chunk("t=0").is_err());
        assert!(parse_chunk("t=-1").is_err());
    }

    #[test]
    fn test_parse_field_type() {
        assert_eq!(
            parse_field_type("gauge").unwrap(),
            FieldTypeDescriptor::name("gauge")
        );
        assert_eq!(
            parse_field_type(r#"["dims", "spin"]"#).unwrap(),
            FieldTypeDescriptor::names(["dims", "spin"])
        );
        assert_eq!(
            parse_field_type(r#"{"t": 4, "color": 3}"#).unwrap(),
            FieldTypeDescriptor::sizes([("t", 4), ("color", 3)])
        );
        assert!(parse_field_type("[1, ").is_err());
    }

    #[test]
    fn test_args() {
        let args = Args::try_parse_from([
            "field-inspector",
            "--lattice",
            "lattice.yaml",
            "--axes-order",
            "color,t,x,y,z,spin",
            "--chunk",
            "t=2",
            "--chunk",
            "spin=2",
            "--candidates",
            "3",
        ])
        .unwrap();
        assert_eq!(args.field_type, "vector");
        assert_eq!(args.axes_order.unwrap().len(), 6);
        assert_eq!(args.chunks.len(), 2);
        assert_eq!(args.candidates, Some(3));
    }
}
