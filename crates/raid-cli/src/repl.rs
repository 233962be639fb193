//! Interactive command interpreter over the façade and filesystem layer,
//! built on `rustyline` the way `kimberlite-cli` drives its own SQL shell:
//! a `Helper`-wired `Editor`, persistent history, and a line-oriented
//! command dispatch loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use raid_rs::client::ServerProxy;
use raid_rs::facade::Facade;
use raid_rs::fs::FileSystem;
use rustyline::completion::Completer;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Config, Editor, Helper};

const HELP_TEXT: &str = r"
Commands:
  get <block>                  read a raw logical block
  put <block> <text>           write a raw logical block
  mkdir <path>                 create a directory (and its parents)
  ls <path>                    list a directory's entries
  create <path>                create an empty file
  write <path> <text>          overwrite a file's contents
  read <path>                  print a file's contents
  ln -s <target> <path>        create a symlink
  unlink <path>                remove a file or symlink
  stat <path>                  show an inode's metadata
  fail <server>                 simulate server <server> refusing connections
  unfail <server>                stop simulating failure for server <server>
  repair <server>               rebuild a failed server from its peers
  verify                        check every stripe's parity
  help                          show this help message
  exit                          leave the shell
";

struct ReplHelper;
impl Completer for ReplHelper {
    type Candidate = String;
}
impl Hinter for ReplHelper {
    type Hint = String;
}
impl Highlighter for ReplHelper {}
impl Validator for ReplHelper {}
impl Helper for ReplHelper {}

/// `run` drives the interactive shell until the user types `exit` or sends EOF.
///
/// `down_handles[i]` is the forced-down switch for server `i`, flipped by the
/// `fail`/`unfail` commands so degraded-mode behavior can be exercised
/// against real `raid-server` processes without killing them.
///
/// # Errors
/// Returns an error if the line editor cannot be initialized.
pub async fn run<P: ServerProxy>(
    facade: Arc<Facade<P>>,
    fs: FileSystem<P>,
    down_handles: Vec<Arc<AtomicBool>>,
) -> anyhow::Result<()> {
    println!("raid-cli shell. Type 'help' for commands, 'exit' to quit.");

    let config = Config::builder()
        .completion_type(rustyline::CompletionType::List)
        .build();
    let mut rl: Editor<ReplHelper, DefaultHistory> = Editor::with_config(config)?;
    rl.set_helper(Some(ReplHelper));

    let history_path = history_path();
    if let Some(path) = &history_path {
        let _ = rl.load_history(path);
    }

    loop {
        match rl.readline("raid> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line).ok();

                if line == "exit" || line == "quit" {
                    break;
                }

                dispatch(line, &facade, &fs, &down_handles).await;
            }
            Err(rustyline::error::ReadlineError::Interrupted) => continue,
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("readline error: {e}");
                break;
            }
        }
    }

    if let Some(path) = &history_path {
        let _ = rl.save_history(path);
    }
    Ok(())
}

async fn dispatch<P: ServerProxy>(
    line: &str,
    facade: &Arc<Facade<P>>,
    fs: &FileSystem<P>,
    down_handles: &[Arc<AtomicBool>],
) {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let result = run_command(&parts, facade, fs, down_handles).await;
    if let Err(e) = result {
        println!("error: {e:#}");
    }
}

async fn run_command<P: ServerProxy>(
    parts: &[&str],
    facade: &Arc<Facade<P>>,
    fs: &FileSystem<P>,
    down_handles: &[Arc<AtomicBool>],
) -> anyhow::Result<()> {
    match parts {
        ["help"] => {
            println!("{HELP_TEXT}");
            Ok(())
        }
        ["get", b] => {
            let block: u64 = b.parse()?;
            let data = facade.get(block).await?;
            println!("{}", String::from_utf8_lossy(&data));
            Ok(())
        }
        ["put", b, rest @ ..] => {
            let block: u64 = b.parse()?;
            let text = rest.join(" ");
            facade.put(block, text.as_bytes()).await?;
            Ok(())
        }
        ["mkdir", path] => fs.mkdir_all(path).await,
        ["ls", path] => {
            for entry in fs.list_dir(path).await? {
                println!("{}", entry.name);
            }
            Ok(())
        }
        ["create", path] => fs.create(path).await,
        ["write", path, rest @ ..] => {
            let text = rest.join(" ");
            fs.write(path, text.as_bytes()).await
        }
        ["read", path] => {
            let data = fs.read(path).await?;
            println!("{}", String::from_utf8_lossy(&data));
            Ok(())
        }
        ["ln", "-s", target, path] => fs.symlink(target, path).await,
        ["unlink", path] => fs.unlink(path).await,
        ["stat", path] => {
            let inode = fs.stat(path).await?;
            println!("{:?} size={} links={}", inode.kind, inode.size, inode.link_count);
            Ok(())
        }
        ["fail", server] => {
            let server: usize = server.parse()?;
            let switch = down_handles
                .get(server)
                .ok_or_else(|| anyhow::anyhow!("server index {server} out of range"))?;
            switch.store(true, Ordering::Relaxed);
            println!("server {server} will now refuse connections");
            Ok(())
        }
        ["unfail", server] => {
            let server: usize = server.parse()?;
            let switch = down_handles
                .get(server)
                .ok_or_else(|| anyhow::anyhow!("server index {server} out of range"))?;
            switch.store(false, Ordering::Relaxed);
            println!("server {server} is reachable again (repair still required to restore parity)");
            Ok(())
        }
        ["repair", server] => {
            let server: usize = server.parse()?;
            facade.repair(server).await?;
            println!("repaired server {server}");
            Ok(())
        }
        ["verify"] => {
            let ok = facade.verify_all().await;
            println!("{}", if ok { "OK" } else { "INCONSISTENT" });
            Ok(())
        }
        [] => Ok(()),
        other => {
            anyhow::bail!("unrecognized command: {}", other.join(" "))
        }
    }
}

fn history_path() -> Option<std::path::PathBuf> {
    let home = std::env::var("HOME").ok()?;
    let dir = std::path::Path::new(&home).join(".raid-cli");
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir.join("repl_history"))
}
