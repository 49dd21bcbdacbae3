//! qscript-cli - bibliothèque interne du binaire `qscript`
//!
//! Le parsing d'arguments reste dans `main.rs` ; ici :
//! - les tâches `compile` (QScript → QB) et `decompile` (QB → QScript),
//! - les E/S (fichier ou stdin/stdout, écriture atomique, dossiers parents),
//! - le logger (`feature = "trace"`) et les lignes de statut (`feature = "color"`).

#![deny(unused_must_use)]
#![forbid(unsafe_code)]

use std::{
    fs,
    fs::File,
    io::{self, BufWriter, Read, Write},
    path::{Path, PathBuf},
    time::Instant,
};

use anyhow::{anyhow, bail, Context, Result};

#[cfg(feature = "color")]
use owo_colors::OwoColorize;

use qscript_compiler::{CompileOptions, Compiler};
use qscript_disasm::{DisasmOptions, Disassembler};

// ───────────────────────────── Types publics ─────────────────────────────

/// Commande haut-niveau (sans parsing CLI).
#[derive(Clone, Debug)]
pub enum Command {
    /// Source → bytecode.
    Compile(CompileTask),
    /// Bytecode → source.
    Decompile(DecompileTask),
}

/// Paramètres de `compile`.
#[derive(Clone, Debug, Default)]
pub struct CompileTask {
    /// Source (fichier ou stdin).
    pub input: Input,
    /// Destination du bytecode.
    pub output: Output,
    /// Cible et numéros de ligne.
    pub options: CompileOptions,
    /// Crée les dossiers parents si besoin.
    pub auto_mkdir: bool,
    /// Autorise l'écrasement.
    pub overwrite: bool,
    /// Affiche la durée.
    pub time: bool,
}

/// Paramètres de `decompile`.
#[derive(Clone, Debug, Default)]
pub struct DecompileTask {
    /// Bytecode (fichier ou stdin).
    pub input: Input,
    /// Destination du texte.
    pub output: Output,
    /// Indentation, étiquettes.
    pub options: DisasmOptions,
    /// Crée les dossiers parents si besoin.
    pub auto_mkdir: bool,
    /// Autorise l'écrasement.
    pub overwrite: bool,
    /// Affiche la durée.
    pub time: bool,
}

/// Entrée : fichier ou `-` (= stdin).
#[derive(Clone, Debug, Default)]
pub enum Input {
    /// Fichier.
    Path(PathBuf),
    /// Entrée standard.
    #[default]
    Stdin,
}

/// Sortie.
#[derive(Clone, Debug, Default)]
pub enum Output {
    /// Fichier.
    Path(PathBuf),
    /// Sortie standard.
    #[default]
    Stdout,
    /// Même nom que l'entrée, extension `.qb` (compile) ou `.q` (decompile).
    Auto,
}

// ───────────────────────────── Initialisation ─────────────────────────────

/// Initialise le logger (`RUST_LOG`, défaut `warn`).
pub fn init_logger() {
    #[cfg(feature = "trace")]
    {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
            .format_timestamp(None)
            .try_init();
    }
}

// ───────────────────────────── Exécution ─────────────────────────────

/// Exécute une commande.
pub fn execute(cmd: Command) -> Result<()> {
    match cmd {
        Command::Compile(t) => compile_entry(t),
        Command::Decompile(t) => decompile_entry(t),
    }
}

fn compile_entry(task: CompileTask) -> Result<()> {
    let CompileTask { input, output, options, auto_mkdir, overwrite, time } = task;
    let bytes = read_input(&input).context("lecture de la source")?;
    let src = String::from_utf8(bytes).map_err(|_| anyhow!("source non UTF-8: {}", describe(&input)))?;

    let start = Instant::now();
    let qb = Compiler::new(options)
        .compile(&src)
        .with_context(|| format!("échec de compilation: {}", describe(&input)))?;
    let elapsed = start.elapsed();
    log::info!("compiled {} -> {} bytes", describe(&input), qb.len());

    let dest = resolve_output(&output, &input, "qb")?;
    emit(dest.as_deref(), &qb, auto_mkdir, overwrite)?;
    if let Some(p) = dest {
        status_ok("COMPILE", &display(&p));
    }
    if time {
        status_info("TIME", &format!("compile: {} ms", elapsed.as_millis()));
    }
    Ok(())
}

fn decompile_entry(task: DecompileTask) -> Result<()> {
    let DecompileTask { input, output, options, auto_mkdir, overwrite, time } = task;
    let qb = read_input(&input).context("lecture du bytecode")?;

    let start = Instant::now();
    let out = Disassembler::new(options)
        .disassemble(&qb)
        .with_context(|| format!("échec de décompilation: {}", describe(&input)))?;
    let elapsed = start.elapsed();

    let dest = resolve_output(&output, &input, "q")?;
    emit(dest.as_deref(), out.text.as_bytes(), auto_mkdir, overwrite)?;
    if let Some(p) = dest {
        status_ok("DECOMPILE", &display(&p));
    }
    if !out.unresolved.is_empty() {
        status_info("NAMES", &format!("{} checksum(s) sans nom", out.unresolved.len()));
    }
    if time {
        status_info("TIME", &format!("decompile: {} ms", elapsed.as_millis()));
    }
    Ok(())
}

// ───────────────────────────── Utilitaires E/S ─────────────────────────────

fn read_input(input: &Input) -> Result<Vec<u8>> {
    match input {
        Input::Stdin => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        },
        Input::Path(p) => fs::read(p).with_context(|| format!("ouverture: {}", display(p))),
    }
}

/// `None` = stdout.
fn resolve_output(output: &Output, input: &Input, ext: &str) -> Result<Option<PathBuf>> {
    match (output, input) {
        (Output::Stdout, _) => Ok(None),
        (Output::Path(p), _) => Ok(Some(p.clone())),
        (Output::Auto, Input::Path(p)) => Ok(Some(default_output_path(p, ext))),
        (Output::Auto, Input::Stdin) => bail!("--auto nécessite un fichier d'entrée"),
    }
}

fn emit(dest: Option<&Path>, bytes: &[u8], auto_mkdir: bool, overwrite: bool) -> Result<()> {
    let Some(path) = dest else {
        let mut w = BufWriter::new(io::stdout().lock());
        w.write_all(bytes)?;
        w.flush()?;
        return Ok(());
    };
    if auto_mkdir {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
    }
    if path.exists() && !overwrite {
        bail!("fichier de sortie existe déjà: {}", display(path));
    }
    write_bytes_atomic(path, bytes).with_context(|| format!("écriture de {}", display(path)))
}

fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp = unique_tmp_path(parent, path.file_name().unwrap_or_default());
    {
        let mut w = BufWriter::new(File::create(&tmp)?);
        w.write_all(bytes)?;
        w.flush()?;
    }
    if path.exists() {
        // Windows : rename sur une cible existante peut échouer
        let _ = fs::remove_file(path);
    }
    fs::rename(&tmp, path).or_else(|_| fs::copy(&tmp, path).and_then(|_| fs::remove_file(&tmp)))?;
    Ok(())
}

fn unique_tmp_path(dir: &Path, base: &std::ffi::OsStr) -> PathBuf {
    let mut i = 0u32;
    loop {
        let candidate = dir.join(format!("{}.tmp{}", base.to_string_lossy(), i));
        if !candidate.exists() {
            return candidate;
        }
        i = i.wrapping_add(1);
    }
}

/// `a/foo.q` → `a/foo.qb` ; `a/foo.qb` → `a/foo.q`.
pub fn default_output_path(src: &Path, ext: &str) -> PathBuf {
    let stem = src.file_stem().and_then(|s| s.to_str()).unwrap_or("out");
    let mut p = src.with_file_name(stem);
    p.set_extension(ext);
    p
}

fn describe(input: &Input) -> String {
    match input {
        Input::Path(p) => display(p),
        Input::Stdin => "<stdin>".into(),
    }
}

fn display(p: &Path) -> String { p.to_string_lossy().to_string() }

// ───────────────────────────── Sorties jolies ─────────────────────────────

fn status_ok(tag: &str, msg: &str) {
    #[cfg(feature = "color")]
    {
        eprintln!("{} {}", tag.green().bold(), msg);
    }
    #[cfg(not(feature = "color"))]
    {
        eprintln!("{tag} {msg}");
    }
}

fn status_info(tag: &str, msg: &str) {
    #[cfg(feature = "color")]
    {
        eprintln!("{} {}", tag.blue().bold(), msg);
    }
    #[cfg(not(feature = "color"))]
    {
        eprintln!("{tag} {msg}");
    }
}

// ───────────────────────────── Tests ─────────────────────────────
