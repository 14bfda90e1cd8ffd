mod command;

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use dropbox_core::{DropboxClient, DropboxConfig, Entry, MetadataOptions, OAuthClient, StaticToken};
use log::debug;

use crate::command::{Command, USAGE, parse_command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match parse_command(std::env::args())? {
        Command::Help => {
            println!("{USAGE}");
            Ok(())
        }
        Command::Auth => authorize().await,
        command => {
            let client = client_from_env()?;
            run(&client, command).await
        }
    }
}

fn client_from_env() -> anyhow::Result<DropboxClient> {
    let token = std::env::var("DROPBOX_ACCESS_TOKEN")
        .context("DROPBOX_ACCESS_TOKEN is not set, run `dropbox auth` first")?;
    let config = DropboxConfig::from_env();
    debug!("using root {} and locale {}", config.root, config.locale);
    Ok(DropboxClient::with_config(config, StaticToken::new(token))?)
}

async fn authorize() -> anyhow::Result<()> {
    let app_key = std::env::var("DROPBOX_APP_KEY").context("DROPBOX_APP_KEY is not set")?;
    let app_secret =
        std::env::var("DROPBOX_APP_SECRET").context("DROPBOX_APP_SECRET is not set")?;
    let client = OAuthClient::new(app_key, app_secret)?;

    println!("Please visit:\n{}", client.authorize_url(None, None));
    print!("Enter the code: ");
    std::io::stdout().flush()?;
    let mut code = String::new();
    std::io::stdin().read_line(&mut code)?;
    let code = code.trim();
    anyhow::ensure!(!code.is_empty(), "authorization code missing");

    let token = client.exchange_code(code, None).await?;
    println!("DROPBOX_ACCESS_TOKEN={}", token.access_token);
    Ok(())
}

async fn run(client: &DropboxClient, command: Command) -> anyhow::Result<()> {
    match command {
        other @ (Command::Help | Command::Auth) => {
            anyhow::bail!("{other:?} does not take a signed-in client")
        }
        Command::Account => {
            let account = client.account_info().await?;
            println!("{} (uid {}, {})", account.display_name, account.uid, account.country);
            println!(
                "quota: {} bytes, used: {} normal + {} shared",
                account.quota_info.quota, account.quota_info.normal, account.quota_info.shared
            );
        }
        Command::List { path } => {
            let options = MetadataOptions {
                list: true,
                ..MetadataOptions::default()
            };
            let entry = client.metadata(&path, &options).await?;
            match entry.contents.as_deref() {
                Some(children) => children.iter().for_each(print_entry),
                None => print_entry(&entry),
            }
        }
        Command::Delta { cursor } => {
            let page = client.delta_all(&cursor, None).await?;
            if page.reset {
                println!("# reset");
            }
            for change in &page.entries {
                match &change.entry {
                    Some(entry) => println!("+ {}", entry.path),
                    None => println!("- {}", change.path),
                }
            }
            println!("cursor: {}", page.cursor);
        }
        Command::Poll { cursor, timeout } => {
            let poll = client.longpoll_delta(&cursor, timeout).await?;
            println!("changes: {}", poll.changes);
            if !poll.backoff().is_zero() {
                println!("backoff: {}s", poll.backoff().as_secs());
            }
        }
        Command::Put { local, remote } => {
            let entry = client
                .upload_file(Path::new(&local), &remote, true, None)
                .await?;
            print_entry(&entry);
        }
        Command::Get { remote, local } => {
            let written = client
                .download_to_file(&remote, Path::new(&local), None)
                .await?;
            println!("{written} bytes written to {local}");
        }
        Command::Resume { remote, local } => {
            let written = client
                .download_to_file_resume(&remote, Path::new(&local), None)
                .await?;
            println!("{written} bytes appended to {local}");
        }
        Command::Remove { path } => {
            let entry = client.delete(&path).await?;
            println!("deleted {}", entry.path);
        }
        Command::MakeDir { path } => {
            let entry = client.create_folder(&path).await?;
            print_entry(&entry);
        }
        Command::Move { from, to } => {
            let entry = client.move_entry(&from, &to).await?;
            print_entry(&entry);
        }
    }
    Ok(())
}

fn print_entry(entry: &Entry) {
    let kind = if entry.is_dir { 'd' } else { '-' };
    println!("{kind} {:>12} {} {}", entry.bytes, entry.modified, entry.path);
}
