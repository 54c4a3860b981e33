//! Reference CLI: reads one MomoScript source file (and optionally a pack
//! manifest JSON file), runs the core pipeline, and prints either the IR or
//! a rendered diagnostic list. This binary is explicitly out of scope as a
//! "full-featured CLI runner" (spec §1 Non-goals) — it exists only to make
//! the library runnable end to end.

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde::Deserialize;

use momoscript::diagnostics::Diagnostic;
use momoscript::mode::{ContinuationJoin, ModeFlags};
use momoscript::pack::{PackRegistry, StaticPackRegistry};
use momoscript::{run, CompileOutcome};

#[derive(Parser)]
#[command(name = "momoscript", about = "Compile a MomoScript source file to IR")]
struct Args {
    /// Path to a `.momo` source file.
    source: PathBuf,

    /// Path to a JSON pack manifest (see `PackManifest`); if omitted an
    /// empty registry is used.
    #[arg(long)]
    packs: Option<PathBuf>,

    /// Enable Typst inline-expression mode.
    #[arg(long)]
    typst: bool,

    /// Join continuation lines with a space instead of a newline.
    #[arg(long)]
    space_join: bool,
}

/// On-disk shape for `--packs`: a flat list of packs, each a flat list of
/// characters. Intentionally simple — a production asset-bundle loader
/// with manifest/EULA/path-traversal handling is out of scope (spec §1).
#[derive(Debug, Deserialize)]
struct PackManifest {
    #[serde(default)]
    default_packs: Vec<String>,
    #[serde(default)]
    packs: Vec<PackEntry>,
}

#[derive(Debug, Deserialize)]
struct PackEntry {
    id: String,
    #[serde(default)]
    characters: Vec<CharacterEntry>,
}

#[derive(Debug, Deserialize)]
struct CharacterEntry {
    name: String,
    char_id: String,
    #[serde(default)]
    avatar: Option<String>,
    #[serde(default)]
    expressions_dir: Option<String>,
}

fn load_registry(path: Option<&PathBuf>) -> Result<StaticPackRegistry, String> {
    let Some(path) = path else {
        return Ok(StaticPackRegistry::builder().build());
    };
    let text = fs::read_to_string(path).map_err(|e| format!("reading {}: {}", path.display(), e))?;
    let manifest: PackManifest =
        serde_json::from_str(&text).map_err(|e| format!("parsing {}: {}", path.display(), e))?;

    let mut builder = StaticPackRegistry::builder();
    for pack_id in &manifest.default_packs {
        builder = builder.default_pack(pack_id.clone());
    }
    for pack in manifest.packs {
        for character in pack.characters {
            builder = builder.character(pack.id.clone(), character.name, character.char_id.clone());
            if let Some(avatar) = character.avatar {
                builder = builder.avatar(pack.id.clone(), character.char_id.clone(), avatar);
            }
            if let Some(dir) = character.expressions_dir {
                builder = builder.expressions_dir(pack.id.clone(), character.char_id, dir);
            }
        }
    }
    Ok(builder.build())
}

/// Human-readable rendering for terminal consumption; the core itself never
/// formats output (spec §6.4) so this lives here, on the CLI side.
struct DiagnosticDisplay<'a>(&'a Diagnostic);

impl fmt::Display for DiagnosticDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;
        for note in &self.0.notes {
            write!(
                f,
                "\n  note: {} ({}:{})",
                note.message, note.span.start.line, note.span.start.column
            )?;
        }
        Ok(())
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let source = match fs::read_to_string(&args.source) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error reading {}: {}", args.source.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let registry = match load_registry(args.packs.as_ref()) {
        Ok(r) => r,
        Err(msg) => {
            eprintln!("error loading pack manifest: {}", msg);
            return ExitCode::FAILURE;
        }
    };

    let mode = ModeFlags {
        typst_mode: args.typst,
        join_continuation_with: if args.space_join {
            ContinuationJoin::Space
        } else {
            ContinuationJoin::Newline
        },
    };

    match run(&source, mode, &registry as &dyn PackRegistry) {
        CompileOutcome::Success { ir, warnings } => {
            for warning in &warnings {
                eprintln!(
                    "warning: {} ({}:{})",
                    warning.message, warning.span.start.line, warning.span.start.column
                );
            }
            match serde_json::to_string_pretty(&ir) {
                Ok(json) => {
                    println!("{}", json);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("error serializing IR: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
        CompileOutcome::Failed { diagnostics } => {
            for diag in &diagnostics {
                eprintln!("{}", DiagnosticDisplay(diag));
            }
            ExitCode::FAILURE
        }
    }
}
