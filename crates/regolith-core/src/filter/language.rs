//! Filters run as child processes of an external runtime
//!
//! Every runtime follows the same template: find the runtime executable,
//! build `[entry, settings-json?, args...]`, run it with the workspace as the
//! working directory and `FILTER_DIR` pointing at the filter's own folder,
//! and fail on a nonzero exit. Output is streamed to the terminal untouched.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::str::FromStr;

use super::{FilterCommon, RunStatus};
use crate::context::RunContext;
use crate::error::{Error, Result};

/// Environment variable holding the filter's root directory
pub const FILTER_DIR_ENV: &str = "FILTER_DIR";

/// Supported `runWith` values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Runtime {
    Python,
    NodeJs,
    Java,
    DotNet,
    Deno,
    Nim,
    Shell,
    Exe,
}

impl Runtime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::NodeJs => "nodejs",
            Self::Java => "java",
            Self::DotNet => "dotnet",
            Self::Deno => "deno",
            Self::Nim => "nim",
            Self::Shell => "shell",
            Self::Exe => "exe",
        }
    }

    /// Executable looked up on PATH. Python is resolved separately and an
    /// exe filter is its own program.
    fn program(&self) -> Option<&'static str> {
        match self {
            Self::Python | Self::Exe => None,
            Self::NodeJs => Some("node"),
            Self::Java => Some("java"),
            Self::DotNet => Some("dotnet"),
            Self::Deno => Some("deno"),
            Self::Nim => Some("nim"),
            Self::Shell => Some(if cfg!(windows) { "cmd" } else { "sh" }),
        }
    }

    /// Arguments placed before the entry point
    fn leading_args(&self) -> &'static [&'static str] {
        match self {
            Self::Python => &["-u"],
            Self::Deno => &["run", "--allow-all"],
            Self::Java => &["-jar"],
            Self::Nim => &["-r", "c", "--hints:off", "--warnings:off"],
            _ => &[],
        }
    }
}

impl FromStr for Runtime {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        Ok(match s {
            "python" => Self::Python,
            "nodejs" => Self::NodeJs,
            "java" => Self::Java,
            "dotnet" => Self::DotNet,
            "deno" => Self::Deno,
            "nim" => Self::Nim,
            "shell" => Self::Shell,
            "exe" => Self::Exe,
            other => return Err(other.to_string()),
        })
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the runtime is pointed at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryPoint {
    /// Script, jar, dll or executable file
    Script(PathBuf),
    /// Shell command line
    Command(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LanguageDefinition {
    pub id: String,
    pub runtime: Runtime,
    pub entry: EntryPoint,
    /// Exposed to the child as `FILTER_DIR`
    pub filter_dir: PathBuf,
    /// Python virtual environment bucket under `.regolith/cache/venvs`
    pub venv_slot: u32,
    pub export_data: bool,
}

impl LanguageDefinition {
    pub fn check(&self, ctx: &RunContext) -> Result<()> {
        match self.runtime {
            Runtime::Python => {
                self.python(ctx)?;
            }
            runtime => {
                if let Some(program) = runtime.program() {
                    find_program(program)?;
                }
            }
        }
        if let EntryPoint::Script(path) = &self.entry {
            if !path.exists() {
                return Err(Error::FilterNotInstalled {
                    id: self.id.clone(),
                    path: path.clone(),
                });
            }
        }
        Ok(())
    }

    /// Python: create the slot's virtual environment and install
    /// `requirements.txt`. Node: `npm i` when there is a `package.json`.
    pub fn install_dependencies(&self, ctx: &RunContext, venv_slot: u32) -> Result<()> {
        match self.runtime {
            Runtime::Python => {
                let venv = ctx.venv_dir(venv_slot);
                let interpreter = venv_python(&venv);
                if !interpreter.exists() {
                    tracing::info!("Creating virtual environment {}", venv.display());
                    let mut cmd = Command::new(system_python()?);
                    cmd.args(["-m", "venv"]).arg(&venv);
                    run_checked(cmd)?;
                }
                let requirements = self.filter_dir.join("requirements.txt");
                if requirements.exists() {
                    tracing::info!("Installing Python requirements of {}", self.id);
                    let mut cmd = Command::new(&interpreter);
                    cmd.args(["-m", "pip", "install", "-r"])
                        .arg(&requirements)
                        .current_dir(&self.filter_dir);
                    run_checked(cmd)?;
                }
            }
            Runtime::NodeJs => {
                if self.filter_dir.join("package.json").exists() {
                    tracing::info!("Installing npm packages of {}", self.id);
                    let mut cmd = Command::new(find_program("npm")?);
                    cmd.args(["i", "--no-fund", "--no-audit"])
                        .current_dir(&self.filter_dir);
                    run_checked(cmd)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Interpreter for this filter: the slot's venv when it exists,
    /// otherwise Python from PATH.
    fn python(&self, ctx: &RunContext) -> Result<PathBuf> {
        let interpreter = venv_python(&ctx.venv_dir(self.venv_slot));
        if interpreter.exists() {
            return Ok(interpreter);
        }
        system_python()
    }

    /// Full command line for one run with `common`'s settings and arguments.
    pub fn command(&self, common: &FilterCommon, ctx: &RunContext) -> Result<Command> {
        let mut args: Vec<OsString> = Vec::new();
        if let Some(settings) = common.settings_json()? {
            args.push(settings.into());
        }
        args.extend(common.arguments.iter().map(OsString::from));

        let mut cmd = match (&self.runtime, &self.entry) {
            (Runtime::Shell, EntryPoint::Command(command)) => shell_command(command)?,
            (Runtime::Exe, EntryPoint::Script(exe)) => Command::new(exe),
            (runtime, EntryPoint::Script(script)) => {
                let program = match runtime.program() {
                    Some(program) => find_program(program)?,
                    None => self.python(ctx)?,
                };
                let mut cmd = Command::new(program);
                cmd.args(runtime.leading_args()).arg(script);
                cmd
            }
            (runtime, EntryPoint::Command(_)) => {
                return Err(Error::UnknownFilterDefinition {
                    id: self.id.clone(),
                    reason: format!("runWith \"{runtime}\" needs a script, not a command"),
                });
            }
        };
        cmd.args(args);
        Ok(cmd)
    }
}

#[derive(Debug, Clone)]
pub struct LanguageFilter {
    pub common: FilterCommon,
    pub definition: LanguageDefinition,
}

impl LanguageFilter {
    pub fn new(common: FilterCommon, definition: LanguageDefinition) -> Self {
        Self { common, definition }
    }

    /// Id used in messages; anonymous remote subfilters use their entry.
    fn label(&self) -> String {
        if !self.common.id.is_empty() {
            return self.common.id.clone();
        }
        match &self.definition.entry {
            EntryPoint::Script(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            EntryPoint::Command(command) => command.clone(),
        }
    }

    /// Run the filter's program to completion.
    ///
    /// The working directory is `.regolith/tmp`, where the `BP`, `RP` and
    /// `data` copies live, not the filter's own folder. Scripts find their
    /// folder through the `FILTER_DIR` environment variable.
    pub fn run(&self, ctx: &RunContext) -> Result<RunStatus> {
        let label = self.label();
        tracing::info!("Running filter {} ({})", label, self.definition.runtime);
        let mut cmd = self.definition.command(&self.common, ctx)?;
        cmd.current_dir(ctx.tmp_dir())
            .env(FILTER_DIR_ENV, &self.definition.filter_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        tracing::debug!("{:?}", cmd);

        let status = cmd.status().map_err(|source| Error::FilterLaunch {
            id: label.clone(),
            source,
        })?;
        if !status.success() {
            return Err(Error::FilterFailed {
                id: label,
                code: status.code(),
            });
        }
        Ok(RunStatus::Completed)
    }
}

/// Run `command` through the system shell; extra arguments become `$1...`.
///
/// - Unix: `sh -c '<command> "$@"' regolith <args>`
/// - Windows: `cmd /C <command> <args>`
fn shell_command(command: &str) -> Result<Command> {
    #[cfg(windows)]
    {
        let mut c = Command::new(find_program("cmd")?);
        c.arg("/C").arg(command);
        Ok(c)
    }
    #[cfg(not(windows))]
    {
        let mut c = Command::new(find_program("sh")?);
        c.arg("-c").arg(format!("{command} \"$@\"")).arg("regolith");
        Ok(c)
    }
}

/// Interpreter inside a virtual environment
pub fn venv_python(venv: &Path) -> PathBuf {
    if cfg!(windows) {
        venv.join("Scripts").join("python.exe")
    } else {
        venv.join("bin").join("python")
    }
}

fn system_python() -> Result<PathBuf> {
    find_program("python").or_else(|_| find_program("python3"))
}

/// Locate `program` on PATH (honoring PATHEXT on Windows).
pub fn find_program(program: &str) -> Result<PathBuf> {
    which::which(program).map_err(|e| {
        tracing::debug!("{} not found on PATH: {}", program, e);
        Error::RuntimeNotFound {
            program: program.to_string(),
            hint: install_hint(program).map(str::to_string),
        }
    })
}

fn install_hint(program: &str) -> Option<&'static str> {
    match program {
        "python" | "python3" => Some("\n  Install: https://www.python.org/downloads"),
        "node" | "npm" => Some("\n  Install: https://nodejs.org"),
        "deno" => Some("\n  Install: https://deno.land"),
        "java" => Some("\n  Install: https://adoptium.net"),
        "dotnet" => Some("\n  Install: https://dotnet.microsoft.com/download"),
        "nim" => Some("\n  Install: https://nim-lang.org/install.html"),
        _ => None,
    }
}

/// Run a helper command with inherited output; nonzero exit is an error.
fn run_checked(mut cmd: Command) -> Result<()> {
    let description = format!("{:?}", cmd);
    let status = cmd
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| {
            tracing::error!("failed to launch {}: {}", description, e);
            Error::CommandFailed {
                command: description.clone(),
                code: None,
            }
        })?;
    if !status.success() {
        return Err(Error::CommandFailed {
            command: description,
            code: status.code(),
        });
    }
    Ok(())
}
