/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use album_activity_store::{
    ActivitySearch, ActivityStore, AssetFilter, NewActivity, StatisticsQuery, StoreConfig,
};
use anyhow::{anyhow, bail, Context, Result};
use tracing::info;

const USAGE: &str = "usage: activity_admin <command>
  init
  health
  search [--user U] [--album A] [--asset X | --no-asset] [--liked true|false]
  stats --album A [--asset X]
  comment --user U --album A [--asset X] TEXT
  like --user U --album A [--asset X]
  delete ID";

#[derive(Debug, Default)]
struct Flags {
    user: Option<String>,
    album: Option<String>,
    asset: Option<String>,
    no_asset: bool,
    liked: Option<bool>,
    rest: Vec<String>,
}

fn parse_flags(args: &[String]) -> Result<Flags> {
    let mut flags = Flags::default();
    let mut it = args.iter();
    while let Some(arg) = it.next() {
        let mut value = |name: &str| {
            it.next()
                .cloned()
                .ok_or_else(|| anyhow!("missing value for {name}"))
        };
        match arg.as_str() {
            "--user" => flags.user = Some(value("--user")?),
            "--album" => flags.album = Some(value("--album")?),
            "--asset" => flags.asset = Some(value("--asset")?),
            "--no-asset" => flags.no_asset = true,
            "--liked" => {
                let v = value("--liked")?;
                flags.liked = Some(match v.trim().to_ascii_lowercase().as_str() {
                    "1" | "true" | "yes" => true,
                    "0" | "false" | "no" => false,
                    other => bail!("--liked expects true or false, got {other}"),
                });
            }
            other if other.starts_with("--") => bail!("unknown flag {other}"),
            other => flags.rest.push(other.to_string()),
        }
    }
    if flags.no_asset && flags.asset.is_some() {
        bail!("--asset and --no-asset are exclusive");
    }
    Ok(flags)
}

fn required(v: Option<String>, name: &str) -> Result<String> {
    v.ok_or_else(|| anyhow!("{name} is required\n{USAGE}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        bail!("{USAGE}");
    };
    let flags = parse_flags(rest)?;

    let cfg = StoreConfig::from_env();
    info!(driver = ?cfg.driver, "opening activity store");
    let store = ActivityStore::open(cfg).context("open activity store")?;

    match command.as_str() {
        "init" => {
            info!("schema applied");
        }
        "health" => {
            store.health_check()?;
            println!("ok");
        }
        "search" => {
            let asset_id = if flags.no_asset {
                AssetFilter::Null
            } else {
                flags.asset.map(AssetFilter::Is).unwrap_or_default()
            };
            let rows = store.search(&ActivitySearch {
                user_id: flags.user,
                asset_id,
                album_id: flags.album,
                is_liked: flags.liked,
            })?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        "stats" => {
            let stats = store.get_statistics(&StatisticsQuery {
                album_id: required(flags.album, "--album")?,
                asset_id: flags.asset,
            })?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        "comment" => {
            let text = flags.rest.join(" ");
            if text.trim().is_empty() {
                bail!("comment text is required\n{USAGE}");
            }
            let user = required(flags.user, "--user")?;
            let album = required(flags.album, "--album")?;
            let row = store.create(&NewActivity::comment(&user, &album, flags.asset.as_deref(), &text))?;
            println!("{}", serde_json::to_string_pretty(&row)?);
        }
        "like" => {
            let user = required(flags.user, "--user")?;
            let album = required(flags.album, "--album")?;
            let row = store.create(&NewActivity::like(&user, &album, flags.asset.as_deref()))?;
            println!("{}", serde_json::to_string_pretty(&row)?);
        }
        "delete" => {
            let id = flags
                .rest
                .first()
                .ok_or_else(|| anyhow!("activity id is required\n{USAGE}"))?;
            store.delete(id)?;
            println!("deleted {id}");
        }
        other => bail!("unknown command {other}\n{USAGE}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::parse_flags;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_search_flags() {
        let flags = parse_flags(&args(&["--album", "a1", "--no-asset", "--liked", "false"])).unwrap();
        assert_eq!(flags.album.as_deref(), Some("a1"));
        assert!(flags.no_asset);
        assert_eq!(flags.liked, Some(false));
    }

    #[test]
    fn rejects_conflicting_asset_flags() {
        assert!(parse_flags(&args(&["--asset", "x1", "--no-asset"])).is_err());
        assert!(parse_flags(&args(&["--liked", "maybe"])).is_err());
        assert!(parse_flags(&args(&["--album"])).is_err());
    }

    #[test]
    fn keeps_positional_text() {
        let flags = parse_flags(&args(&["--user", "u1", "nice", "shot"])).unwrap();
        assert_eq!(flags.rest, vec!["nice".to_string(), "shot".to_string()]);
    }
}
