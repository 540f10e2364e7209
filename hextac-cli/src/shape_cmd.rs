//! Shape command - print hex shapes around a center

use anyhow::{bail, Result};
use clap::{Args, ValueEnum};

use hextac_core::{disk, line, ring, HexCoord, Layout};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ShapeKind {
    Disk,
    Ring,
    Line,
}

#[derive(Args)]
pub struct ShapeArgs {
    #[arg(long, value_enum, default_value = "disk")]
    pub kind: ShapeKind,

    /// Center column (line start for --kind line)
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub q: i32,

    /// Center row (line start for --kind line)
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub r: i32,

    /// Radius for disk and ring
    #[arg(long, default_value = "1")]
    pub radius: i32,

    /// Line end as "q,r"
    #[arg(long, value_name = "Q,R", allow_hyphen_values = true)]
    pub to: Option<String>,

    /// Also print world positions for this cell outer radius
    #[arg(long)]
    pub world: Option<f32>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: ShapeArgs) -> Result<()> {
    let cells = build_shape(&args)?;
    tracing::debug!("{:?} produced {} cells", args.kind, cells.len());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&cells)?);
        return Ok(());
    }

    let layout = args.world.map(|radius| Layout::new(radius, true));
    for cell in &cells {
        match layout {
            Some(layout) => {
                let pos = layout.grid_to_world(*cell);
                println!("{}  ->  ({:.3}, {:.3})", cell, pos.x, pos.z);
            }
            None => println!("{}", cell),
        }
    }
    println!("{} cells", cells.len());
    Ok(())
}

fn build_shape(args: &ShapeArgs) -> Result<Vec<HexCoord>> {
    let center = HexCoord::new(args.q, args.r);
    let cells = match args.kind {
        ShapeKind::Disk => disk(center, args.radius).collect(),
        ShapeKind::Ring => ring(center, args.radius).collect(),
        ShapeKind::Line => {
            let Some(to) = &args.to else {
                bail!("--kind line needs --to Q,R");
            };
            line(center, parse_coord(to)?)
        }
    };
    Ok(cells)
}

/// Parse "q,r"
fn parse_coord(s: &str) -> Result<HexCoord> {
    let Some((q, r)) = s.split_once(',') else {
        bail!("expected Q,R but got `{}`", s);
    };
    Ok(HexCoord::new(q.trim().parse()?, r.trim().parse()?))
}

// ============================================================================
// TESTS
// ============================================================================
