//! `qscript` - compilateur / décompilateur QScript ↔ QB
//!
//! Ici uniquement : parsing d'arguments, initialisation (logger, couleur) et
//! délégation à `qscript_cli` (lib).
//!
//! Exemples :
//!   qscript compile level.q -o level.qb --target thug2
//!   qscript decompile level.qb --auto
//!   cat level.qb | qscript decompile - --indent-spaces 4

#![forbid(unsafe_code)]

use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use qscript_cli as cli;
use qscript_compiler::{CompileOptions, Target};
use qscript_disasm::DisasmOptions;

// ──────────────────────────── CLI (clap) ────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "qscript", version, about = "QScript ↔ QB : compiler, décompiler", long_about = None)]
struct Opt {
    /// Augmente la verbosité (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux (erreurs seulement)
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue, global = true)]
    quiet: bool,

    /// Couleur des lignes de statut
    #[arg(long = "color", value_enum, default_value_t = ColorChoice::Auto, global = true)]
    color: ColorChoice,

    /// Sous-commandes
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TargetArg {
    /// Mots-clés complets
    Thug1,
    /// If/else/switch à sauts courts
    Thug2,
}

impl From<TargetArg> for Target {
    fn from(t: TargetArg) -> Self {
        match t {
            TargetArg::Thug1 => Self::Thug1,
            TargetArg::Thug2 => Self::Thug2,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compiler une source QScript vers du bytecode QB
    Compile {
        /// Fichier source (ou - pour stdin)
        input: Option<PathBuf>,
        /// Fichier de sortie (stdout si omis et pas --auto)
        #[arg(short, long, conflicts_with = "auto")]
        output: Option<PathBuf>,
        /// Jeu d'instructions visé
        #[arg(long, value_enum, default_value_t = TargetArg::Thug1)]
        target: TargetArg,
        /// Émettre les numéros de ligne
        #[arg(long = "line-numbers")]
        line_numbers: bool,
        /// Créer les dossiers parents si nécessaire
        #[arg(long = "mkdir")]
        auto_mkdir: bool,
        /// Écraser le fichier de sortie
        #[arg(long)]
        overwrite: bool,
        /// Afficher le temps d'exécution
        #[arg(long)]
        time: bool,
        /// Sortie auto : même nom + .qb
        #[arg(long)]
        auto: bool,
    },

    /// Décompiler un bytecode QB vers du texte QScript
    Decompile {
        /// Bytecode (ou - pour stdin)
        input: Option<PathBuf>,
        /// Fichier de sortie (stdout si omis et pas --auto)
        #[arg(short, long, conflicts_with = "auto")]
        output: Option<PathBuf>,
        /// Imprimer les étiquettes des sauts courts (texte non recompilable)
        #[arg(long)]
        labels: bool,
        /// Indenter avec N espaces au lieu d'une tabulation
        #[arg(long = "indent-spaces", value_name = "N")]
        indent_spaces: Option<usize>,
        /// Créer les dossiers parents si nécessaire
        #[arg(long = "mkdir")]
        auto_mkdir: bool,
        /// Écraser le fichier de sortie
        #[arg(long)]
        overwrite: bool,
        /// Afficher le temps d'exécution
        #[arg(long)]
        time: bool,
        /// Sortie auto : même nom + .q
        #[arg(long)]
        auto: bool,
    },
}

// ──────────────────────────── Entrée / Sortie ────────────────────────────

fn input_from_opt(p: Option<PathBuf>) -> cli::Input {
    match p {
        Some(path) if path.as_os_str() == "-" => cli::Input::Stdin,
        Some(path) => cli::Input::Path(path),
        None => cli::Input::Stdin,
    }
}

fn output_from_opt(output: Option<PathBuf>, auto: bool) -> cli::Output {
    if auto {
        return cli::Output::Auto;
    }
    match output {
        Some(p) if p.as_os_str() == "-" => cli::Output::Stdout,
        Some(p) => cli::Output::Path(p),
        None => cli::Output::Stdout,
    }
}

// ──────────────────────────── Logger / Verbosité ────────────────────────────

fn init_telemetry(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    std::env::set_var("RUST_LOG", std::env::var("RUST_LOG").unwrap_or_else(|_| level.to_string()));
    cli::init_logger();
}

fn init_color(choice: ColorChoice) {
    // owo-colors détecte le TTY ; on ne force que sur demande
    match choice {
        ColorChoice::Auto => {},
        ColorChoice::Always => {
            std::env::set_var("CLICOLOR_FORCE", "1");
            std::env::remove_var("NO_COLOR");
        },
        ColorChoice::Never => {
            std::env::set_var("NO_COLOR", "1");
            std::env::remove_var("CLICOLOR_FORCE");
        },
    }
}

// ──────────────────────────── main ────────────────────────────

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        eprintln!("error: {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn real_main() -> Result<()> {
    let opt = Opt::parse();

    init_color(opt.color);
    init_telemetry(opt.verbose, opt.quiet);

    let command = match opt.cmd {
        Command::Compile { input, output, target, line_numbers, auto_mkdir, overwrite, time, auto } => {
            cli::Command::Compile(cli::CompileTask {
                input: input_from_opt(input),
                output: output_from_opt(output, auto),
                options: CompileOptions { target: target.into(), line_numbers },
                auto_mkdir,
                overwrite,
                time,
            })
        },
        Command::Decompile { input, output, labels, indent_spaces, auto_mkdir, overwrite, time, auto } => {
            let indent = indent_spaces.map_or_else(|| "\t".to_owned(), |n| " ".repeat(n));
            cli::Command::Decompile(cli::DecompileTask {
                input: input_from_opt(input),
                output: output_from_opt(output, auto),
                options: DisasmOptions { indent, branch_labels: labels },
                auto_mkdir,
                overwrite,
                time,
            })
        },
    };

    cli::execute(command).context("échec d'exécution de la commande")
}
