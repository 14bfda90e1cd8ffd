use anyhow::{Context, bail};

pub const USAGE: &str = "\
Usage: dropbox <command> [args]
  auth                      Authorize this app and print an access token
  account                   Show account information
  ls <path>                 List a folder
  delta [cursor]            Print changes since cursor (all entries without one)
  poll <cursor> [timeout]   Wait for changes behind cursor (timeout 30..480 s)
  put <local> <remote>      Upload a file
  get <remote> <local>      Download a file
  resume <remote> <local>   Continue an interrupted download
  rm <path>                 Delete a file or folder
  mkdir <path>              Create a folder
  mv <from> <to>            Move a file or folder

Environment: DROPBOX_ACCESS_TOKEN, DROPBOX_APP_KEY, DROPBOX_APP_SECRET,
DROPBOX_ROOT, DROPBOX_LOCALE, DROPBOX_CHUNK_SIZE, DROPBOX_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Auth,
    Account,
    List { path: String },
    Delta { cursor: String },
    Poll { cursor: String, timeout: Option<u32> },
    Put { local: String, remote: String },
    Get { remote: String, local: String },
    Resume { remote: String, local: String },
    Remove { path: String },
    MakeDir { path: String },
    Move { from: String, to: String },
}

pub fn parse_command<I>(args: I) -> anyhow::Result<Command>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter().skip(1);
    let Some(name) = args.next() else {
        return Ok(Command::Help);
    };
    let rest: Vec<String> = args.collect();
    let command = match (name.as_str(), rest.as_slice()) {
        ("--help" | "-h" | "help", _) => Command::Help,
        ("auth", []) => Command::Auth,
        ("account", []) => Command::Account,
        ("ls", []) => Command::List {
            path: "/".to_string(),
        },
        ("ls", [path]) => Command::List { path: path.clone() },
        ("delta", []) => Command::Delta {
            cursor: String::new(),
        },
        ("delta", [cursor]) => Command::Delta {
            cursor: cursor.clone(),
        },
        ("poll", [cursor]) => Command::Poll {
            cursor: cursor.clone(),
            timeout: None,
        },
        ("poll", [cursor, timeout]) => Command::Poll {
            cursor: cursor.clone(),
            timeout: Some(
                timeout
                    .parse()
                    .with_context(|| format!("invalid timeout: {timeout}"))?,
            ),
        },
        ("put", [local, remote]) => Command::Put {
            local: local.clone(),
            remote: remote.clone(),
        },
        ("get", [remote, local]) => Command::Get {
            remote: remote.clone(),
            local: local.clone(),
        },
        ("resume", [remote, local]) => Command::Resume {
            remote: remote.clone(),
            local: local.clone(),
        },
        ("rm", [path]) => Command::Remove { path: path.clone() },
        ("mkdir", [path]) => Command::MakeDir { path: path.clone() },
        ("mv", [from, to]) => Command::Move {
            from: from.clone(),
            to: to.clone(),
        },
        (
            "auth" | "account" | "ls" | "delta" | "poll" | "put" | "get" | "resume" | "rm"
            | "mkdir" | "mv",
            _,
        ) => bail!("wrong number of arguments for {name}"),
        (other, _) => bail!("unknown command: {other}"),
    };
    Ok(command)
}
