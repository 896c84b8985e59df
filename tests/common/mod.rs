// Shared helpers for integration tests.
//
// A `Sandbox` is a temporary directory holding the target user's home, a
// staging directory of dotfiles and a `provision.toml` pointing every path
// into the sandbox. Real filesystem operations run against it; programs,
// downloads and the account database are faked so a run never leaves the
// temporary directory.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use provision_cli::accounts::{Account, AccountDatabase};
use provision_cli::cli::{GlobalOpts, InstallOpts};
use provision_cli::commands;
use provision_cli::exec::{ExecResult, Executor};
use provision_cli::fetch::Fetcher;
use provision_cli::logging::{Logger, TaskEntry};
use provision_cli::operations::SystemFileSystemOps;
use provision_cli::tasks::SystemAccess;

/// Login name of the sandboxed account.
pub const USER: &str = "dev";

/// Staged `.zshrc` contents.
pub const STAGED_ZSHRC: &str = "export ZSH=\"$HOME/.oh-my-zsh\"\nZSH_THEME=\"powerlevel10k/powerlevel10k\"\n";

/// Staged `.tmux.conf` contents.
pub const STAGED_TMUX: &str = "set -g mouse on\n";

fn ok(stdout: &str) -> ExecResult {
    ExecResult {
        stdout: stdout.to_string(),
        stderr: String::new(),
        success: true,
        code: Some(0),
    }
}

/// Account database holding a single user whose uid/gid are the test
/// process's own, so `chown` works without root.
#[derive(Debug)]
pub struct FakeAccounts {
    home: PathBuf,
    shell: Mutex<String>,
    privileged: AtomicBool,
}

impl FakeAccounts {
    fn new(home: PathBuf) -> Self {
        Self {
            home,
            shell: Mutex::new("/bin/bash".to_string()),
            privileged: AtomicBool::new(true),
        }
    }

    pub fn shell(&self) -> String {
        self.shell.lock().expect("shell lock").clone()
    }

    pub fn set_shell(&self, shell: &str) {
        *self.shell.lock().expect("shell lock") = shell.to_string();
    }

    pub fn set_privileged(&self, privileged: bool) {
        self.privileged.store(privileged, Ordering::SeqCst);
    }
}

impl AccountDatabase for FakeAccounts {
    fn lookup(&self, name: &str) -> anyhow::Result<Option<Account>> {
        if name != USER {
            return Ok(None);
        }
        Ok(Some(Account {
            name: USER.to_string(),
            uid: nix::unistd::getuid().as_raw(),
            gid: nix::unistd::getgid().as_raw(),
            home: self.home.clone(),
            shell: PathBuf::from(self.shell()),
        }))
    }

    fn is_privileged(&self) -> bool {
        self.privileged.load(Ordering::SeqCst)
    }
}

/// Executor that records every command line and simulates the side effects
/// of the programs a provisioning run invokes.
#[derive(Debug)]
pub struct FakeExecutor {
    home: PathBuf,
    accounts: Arc<FakeAccounts>,
    managers: Mutex<Vec<String>>,
    installed: Mutex<BTreeSet<String>>,
    fail_on: Mutex<Option<(String, i32)>>,
    calls: Mutex<Vec<String>>,
}

impl FakeExecutor {
    fn new(home: PathBuf, accounts: Arc<FakeAccounts>) -> Self {
        Self {
            home,
            accounts,
            managers: Mutex::new(vec!["apt-get".to_string()]),
            installed: Mutex::new(BTreeSet::new()),
            fail_on: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Programs reported as present on `PATH`.
    pub fn set_managers(&self, managers: &[&str]) {
        *self.managers.lock().expect("managers lock") =
            managers.iter().map(ToString::to_string).collect();
    }

    /// Fail any command line containing `needle` with exit `code`.
    pub fn fail_on(&self, needle: &str, code: i32) {
        *self.fail_on.lock().expect("fail_on lock") = Some((needle.to_string(), code));
    }

    /// Every recorded command line, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    /// Recorded command lines containing `needle`.
    pub fn calls_matching(&self, needle: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.contains(needle))
            .collect()
    }

    pub fn installed(&self) -> BTreeSet<String> {
        self.installed.lock().expect("installed lock").clone()
    }

    fn record(&self, program: &str, args: &[&str]) -> Option<ExecResult> {
        let line = if args.is_empty() {
            program.to_string()
        } else {
            format!("{program} {}", args.join(" "))
        };
        self.calls.lock().expect("calls lock").push(line.clone());

        let fail_on = self.fail_on.lock().expect("fail_on lock").clone();
        fail_on
            .filter(|(needle, _)| line.contains(needle.as_str()))
            .map(|(_, code)| ExecResult {
                stdout: String::new(),
                stderr: format!("simulated failure of {program}"),
                success: false,
                code: Some(code),
            })
    }

    fn simulate(&self, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
        match (program, args) {
            // sudo -u <user> -H env [K=V...] <program> <args...>
            ("sudo", ["-u", _, "-H", "env", rest @ ..]) => {
                let start = rest.iter().position(|a| !a.contains('=')).unwrap_or(rest.len());
                match rest.get(start..) {
                    Some([inner, inner_args @ ..]) => self.simulate(inner, inner_args),
                    _ => Ok(ok("")),
                }
            }
            ("dpkg-query", _) => {
                let stdout: String = self
                    .installed()
                    .iter()
                    .map(|name| format!("ii  {name}\n"))
                    .collect();
                Ok(ok(&stdout))
            }
            ("apt-get", ["install", "-y", name]) => {
                self.installed
                    .lock()
                    .expect("installed lock")
                    .insert((*name).to_string());
                Ok(ok(""))
            }
            ("chsh", ["-s", shell, _user]) => {
                self.accounts.set_shell(shell);
                Ok(ok(""))
            }
            ("bash", [_installer, "-b", "-p", prefix]) => {
                std::fs::create_dir_all(prefix)?;
                Ok(ok(""))
            }
            ("sh", ["-c", _script]) => {
                std::fs::create_dir_all(self.home.join(".oh-my-zsh"))?;
                Ok(ok(""))
            }
            ("git", ["clone", .., dir]) => {
                std::fs::create_dir_all(dir)?;
                Ok(ok(""))
            }
            ("ssh-keygen", _) => {
                if let Some(i) = args.iter().position(|a| *a == "-f")
                    && let Some(path) = args.get(i + 1)
                {
                    std::fs::write(path, "PRIVATE KEY\n")?;
                    std::fs::write(format!("{path}.pub"), "ssh-ed25519 AAAA dev@example.com\n")?;
                }
                Ok(ok(""))
            }
            _ => Ok(ok("")),
        }
    }
}

impl Executor for FakeExecutor {
    fn run(&self, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
        match self.record(program, args) {
            Some(failed) => failed.check(program),
            None => self.simulate(program, args),
        }
    }

    fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        _env: &[(&str, &str)],
    ) -> anyhow::Result<ExecResult> {
        self.run(program, args)
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
        match self.record(program, args) {
            Some(failed) => Ok(failed),
            None => self.simulate(program, args),
        }
    }

    fn resolve(&self, program: &str) -> Option<PathBuf> {
        let on_path = self
            .managers
            .lock()
            .expect("managers lock")
            .iter()
            .any(|m| m == program)
            || self.installed().contains(program);
        on_path.then(|| PathBuf::from("/usr/bin").join(program))
    }
}

/// Fetcher that records requested URLs and destinations without touching
/// the network.
#[derive(Debug, Default)]
pub struct FakeFetcher {
    downloads: Mutex<Vec<(String, PathBuf)>>,
}

impl FakeFetcher {
    pub fn urls(&self) -> Vec<String> {
        self.downloads
            .lock()
            .expect("downloads lock")
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    /// Every path a download was written to.
    pub fn destinations(&self) -> Vec<PathBuf> {
        self.downloads
            .lock()
            .expect("downloads lock")
            .iter()
            .map(|(_, dest)| dest.clone())
            .collect()
    }
}

impl Fetcher for FakeFetcher {
    fn download(&self, url: &str, dest: &Path) -> anyhow::Result<()> {
        std::fs::write(dest, "#!/bin/sh\n")?;
        self.downloads
            .lock()
            .expect("downloads lock")
            .push((url.to_string(), dest.to_path_buf()));
        Ok(())
    }
}

/// An isolated host backed by a [`tempfile::TempDir`].
pub struct Sandbox {
    /// Temporary root; deleted on drop.
    pub root: tempfile::TempDir,
    pub accounts: Arc<FakeAccounts>,
    pub executor: Arc<FakeExecutor>,
    pub fetcher: Arc<FakeFetcher>,
    settings: Vec<(String, String)>,
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Sandbox {
    /// Home and staging directories plus a config using the dotfile
    /// strategy with `.zshrc` and `.tmux.conf`.
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        let home = root.path().join("home").join(USER);
        let staging = root.path().join("staging");
        std::fs::create_dir_all(&home).expect("create home");
        std::fs::create_dir_all(&staging).expect("create staging");
        std::fs::write(staging.join(".zshrc"), STAGED_ZSHRC).expect("stage .zshrc");
        std::fs::write(staging.join(".tmux.conf"), STAGED_TMUX).expect("stage .tmux.conf");

        let literal = |p: PathBuf| format!("'{}'", p.display());
        let settings = vec![
            ("username".to_string(), format!("\"{USER}\"")),
            ("home_dir".to_string(), literal(home.clone())),
            (
                "conda_path".to_string(),
                literal(root.path().join("opt/miniconda3")),
            ),
            (
                "conda_init_path".to_string(),
                literal(root.path().join("etc/profile.d/conda.sh")),
            ),
            ("dotfiles_dir".to_string(), literal(staging)),
            (
                "dotfile_list".to_string(),
                "[\".zshrc\", \".tmux.conf\"]".to_string(),
            ),
            ("packages".to_string(), "[\"git\", \"zsh\"]".to_string()),
        ];

        let accounts = Arc::new(FakeAccounts::new(home.clone()));
        let executor = Arc::new(FakeExecutor::new(home, Arc::clone(&accounts)));
        let sandbox = Self {
            root,
            accounts,
            executor,
            fetcher: Arc::new(FakeFetcher::default()),
            settings,
        };
        sandbox.write_config();
        sandbox
    }

    /// Replace (or add) a top-level config key with a raw TOML value.
    pub fn set(mut self, key: &str, value: &str) -> Self {
        match self.settings.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.settings.push((key.to_string(), value.to_string())),
        }
        self.write_config();
        self
    }

    fn write_config(&self) {
        let toml: String = self
            .settings
            .iter()
            .map(|(k, v)| format!("{k} = {v}\n"))
            .collect();
        std::fs::write(self.config_path(), toml).expect("write provision.toml");
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.path().join("provision.toml")
    }

    pub fn home(&self) -> PathBuf {
        self.root.path().join("home").join(USER)
    }

    pub fn home_path(&self, rel: &str) -> PathBuf {
        self.home().join(rel)
    }

    pub fn conda_prefix(&self) -> PathBuf {
        self.root.path().join("opt/miniconda3")
    }

    pub fn conda_init(&self) -> PathBuf {
        self.root.path().join("etc/profile.d/conda.sh")
    }

    pub fn theme_dir(&self) -> PathBuf {
        self.home_path(".oh-my-zsh/custom/themes/powerlevel10k")
    }

    pub fn key_path(&self) -> PathBuf {
        self.home_path(".ssh/id_ed25519_github")
    }

    /// Write `contents` at `rel` under the home directory.
    pub fn write_home(&self, rel: &str, contents: &str) {
        let path = self.home_path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::write(path, contents).expect("write home file");
    }

    pub fn read_home(&self, rel: &str) -> String {
        std::fs::read_to_string(self.home_path(rel)).expect("read home file")
    }

    /// Sorted names of the home directory's direct children.
    pub fn home_entries(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.home())
            .expect("read home")
            .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    pub fn system(&self) -> SystemAccess {
        SystemAccess {
            executor: Arc::clone(&self.executor) as Arc<dyn Executor>,
            fs_ops: Arc::new(SystemFileSystemOps),
            accounts: Arc::clone(&self.accounts) as Arc<dyn AccountDatabase>,
            fetcher: Arc::clone(&self.fetcher) as Arc<dyn Fetcher>,
        }
    }

    pub fn global(&self, dry_run: bool) -> GlobalOpts {
        GlobalOpts {
            config: Some(self.config_path()),
            dry_run,
        }
    }

    /// Run `install` with `opts`, returning the result and the recorded
    /// task outcomes.
    pub fn install_with(
        &self,
        opts: &InstallOpts,
        dry_run: bool,
    ) -> (anyhow::Result<()>, Vec<TaskEntry>) {
        let log = Arc::new(Logger::new("test"));
        let result = commands::install::run(&self.global(dry_run), opts, &log, self.system());
        (result, log.task_entries())
    }

    pub fn install(&self) -> (anyhow::Result<()>, Vec<TaskEntry>) {
        self.install_with(&InstallOpts::default(), false)
    }

    pub fn status(&self) -> (anyhow::Result<()>, Vec<TaskEntry>) {
        let log = Arc::new(Logger::new("test"));
        let result = commands::status::run(&self.global(false), &log, self.system());
        (result, log.task_entries())
    }
}
