//! Configuration loading from `.env` files.

use std::{collections::HashMap, env, sync::Arc, time::Duration};

use anyhow::{anyhow, Context as _, Result};

use crate::{
    access::AccessPolicy,
    nip19::{self, NOTE, NPUB},
    quiz::{QuizCorpus, QuizEngine},
    relay::WsRelayClient,
    responder::Context,
    signer::Signer,
};

/// Channel quiz puzzles are posted to unless `QUIZ_CHANNEL` says otherwise.
pub const DEFAULT_QUIZ_CHANNEL: &str =
    "c8d5c2709a5670d6f621ac8020ac3e4fc3057a4961a15319f7c0818309407723";
const DEFAULT_RELAY_URL: &str = "wss://yabu.me";
const DEFAULT_RELAY_TIMEOUT_SECS: u64 = 10;

/// Runtime settings derived from environment variables.
#[derive(Debug, Clone)]
pub struct Settings {
    /// HTTP bind address, e.g. `127.0.0.1:8787`.
    pub bind_http: String,
    /// Relay consulted when grading quiz answers.
    pub relay_url: String,
    /// Bound on the relay connection and on waiting for EOSE.
    pub relay_timeout: Duration,
    /// Optional Tor SOCKS proxy (host:port).
    pub tor_socks: Option<String>,
    /// Verify id and Schnorr signature of inbound events.
    pub verify_sig: bool,
    /// Bot name → `nsec1` or hex secret key; `/{name}` answers with that
    /// identity.
    pub bot_keys: Vec<(String, String)>,
    pub quiz_channel: String,
    /// Overrides the built-in channel allow-list. Stored as hex; `note1`
    /// ids are accepted in the file.
    pub allowed_channels: Option<Vec<String>>,
    /// Overrides the built-in author deny-list. Stored as hex; `npub1` keys
    /// are accepted in the file.
    pub denied_authors: Option<Vec<String>>,
}

impl Settings {
    /// Load settings from the specified `.env` file.
    pub fn from_env(path: &str) -> Result<Self> {
        dotenvy::from_filename(path).context("reading env file")?;
        let bind_http = env::var("BIND_HTTP").context("BIND_HTTP is not set")?;
        let relay_url = env::var("RELAY_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_RELAY_URL.into());
        let relay_timeout = match env::var("RELAY_TIMEOUT_SECS") {
            Ok(s) if !s.trim().is_empty() => s
                .trim()
                .parse()
                .with_context(|| format!("invalid RELAY_TIMEOUT_SECS `{s}`"))?,
            _ => DEFAULT_RELAY_TIMEOUT_SECS,
        };
        let tor_socks = env::var("TOR_SOCKS").ok().filter(|s| !s.is_empty());
        let verify_sig = env::var("VERIFY_SIG").unwrap_or_else(|_| "1".into()) == "1";
        let bot_keys = csv_strings(env::var("BOT_KEYS").unwrap_or_default())
            .into_iter()
            .map(|entry| -> Result<(String, String)> {
                let (name, key) = entry
                    .split_once('=')
                    .ok_or_else(|| anyhow!("BOT_KEYS entry `{entry}` is not name=key"))?;
                Ok((name.trim().to_string(), key.trim().to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        let quiz_channel = env::var("QUIZ_CHANNEL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_QUIZ_CHANNEL.into());
        let allowed_channels = env::var("ALLOWED_CHANNELS")
            .ok()
            .and_then(non_empty_csv)
            .map(|ids| hex_list("ALLOWED_CHANNELS", NOTE, ids))
            .transpose()?;
        let denied_authors = env::var("DENIED_AUTHORS")
            .ok()
            .and_then(non_empty_csv)
            .map(|keys| hex_list("DENIED_AUTHORS", NPUB, keys))
            .transpose()?;
        Ok(Self {
            bind_http,
            relay_url,
            relay_timeout: Duration::from_secs(relay_timeout),
            tor_socks,
            verify_sig,
            bot_keys,
            quiz_channel,
            allowed_channels,
            denied_authors,
        })
    }

    /// Signing identity for every configured bot name.
    pub fn signers(&self) -> Result<HashMap<String, Signer>> {
        self.bot_keys
            .iter()
            .map(|(name, key)| -> Result<(String, Signer)> {
                let signer = Signer::from_secret(key)
                    .with_context(|| format!("secret key of bot `{name}`"))?;
                Ok((name.clone(), signer))
            })
            .collect()
    }

    /// Shared responder context with any list overrides applied.
    pub fn context(&self) -> Arc<Context> {
        let relay = WsRelayClient::new(
            self.relay_url.clone(),
            self.relay_timeout,
            self.tor_socks.clone(),
        );
        let quiz = QuizEngine::new(QuizCorpus::default(), self.quiz_channel.clone());
        let mut ctx = Context::new(quiz, Arc::new(relay));
        if self.allowed_channels.is_some() || self.denied_authors.is_some() {
            let defaults =
                |list: &[&str]| -> Vec<String> { list.iter().map(|s| s.to_string()).collect() };
            ctx.policy = AccessPolicy::new(
                self.denied_authors
                    .clone()
                    .unwrap_or_else(|| defaults(&crate::access::DEFAULT_DENIED_AUTHORS)),
                self.allowed_channels
                    .clone()
                    .unwrap_or_else(|| defaults(&crate::access::DEFAULT_ALLOWED_CHANNELS)),
            );
        }
        Arc::new(ctx)
    }
}

fn hex_list(var: &str, hrp: bech32::Hrp, entries: Vec<String>) -> Result<Vec<String>> {
    entries
        .iter()
        .map(|e| nip19::to_hex(hrp, e).with_context(|| format!("{var} entry `{e}`")))
        .collect()
}

fn non_empty_csv(input: String) -> Option<Vec<String>> {
    let v = csv_strings(input);
    if v.is_empty() {
        None
    } else {
        Some(v)
    }
}

/// Split a comma-separated string into trimmed string values.
pub fn csv_strings(input: impl AsRef<str>) -> Vec<String> {
    let s = input.as_ref();
    s.split(',')
        .filter_map(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .collect()
}

/// Serializes tests that touch process environment variables.
#[cfg(test)]
pub(crate) static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Forget every variable [`Settings::from_env`] reads.
#[cfg(test)]
pub(crate) fn clear_env() {
    for v in [
        "BIND_HTTP",
        "RELAY_URL",
        "RELAY_TIMEOUT_SECS",
        "TOR_SOCKS",
        "VERIFY_SIG",
        "BOT_KEYS",
        "QUIZ_CHANNEL",
        "ALLOWED_CHANNELS",
        "DENIED_AUTHORS",
    ] {
        env::remove_var(v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use std::fs;
    use tempfile::tempdir;

    const KEY: &str = "0101010101010101010101010101010101010101010101010101010101010101";

    fn load(content: &str) -> Result<Settings> {
        let dir = tempdir().unwrap();
        let env_path = dir.path().join(".env");
        fs::write(&env_path, content).unwrap();
        Settings::from_env(env_path.to_str().unwrap())
    }

    #[test]
    fn loads_env() {
        let _g = ENV_MUTEX.lock().unwrap();
        clear_env();
        let cfg = load(&format!(
            concat!(
                "BIND_HTTP=127.0.0.1:8080\n",
                "RELAY_URL=ws://relay.local\n",
                "RELAY_TIMEOUT_SECS=3\n",
                "TOR_SOCKS=\n",
                "VERIFY_SIG=0\n",
                "BOT_KEYS=rinrin={key},chunchun={key}\n",
                "QUIZ_CHANNEL=abcd\n",
                "ALLOWED_CHANNELS={c1},{c2}\n",
                "DENIED_AUTHORS={bad}\n"
            ),
            key = KEY,
            c1 = "c1".repeat(32),
            c2 = "c2".repeat(32),
            bad = "ba".repeat(32),
        ))
        .unwrap();
        assert_eq!(cfg.bind_http, "127.0.0.1:8080");
        assert_eq!(cfg.relay_url, "ws://relay.local");
        assert_eq!(cfg.relay_timeout, Duration::from_secs(3));
        assert!(cfg.tor_socks.is_none());
        assert!(!cfg.verify_sig);
        assert_eq!(
            cfg.bot_keys,
            vec![
                ("rinrin".to_string(), KEY.to_string()),
                ("chunchun".to_string(), KEY.to_string())
            ]
        );
        assert_eq!(cfg.quiz_channel, "abcd");
        assert_eq!(
            cfg.allowed_channels,
            Some(vec!["c1".repeat(32), "c2".repeat(32)])
        );
        assert_eq!(cfg.denied_authors, Some(vec!["ba".repeat(32)]));
        assert_eq!(cfg.signers().unwrap().len(), 2);
    }

    #[test]
    fn csv_helpers() {
        assert_eq!(csv_strings("a, b , ,c"), vec!["a", "b", "c"]);
        assert!(csv_strings("").is_empty());
        assert!(non_empty_csv(" , ".into()).is_none());
    }

    #[test]
    fn tor_socks_parsed() {
        let _g = ENV_MUTEX.lock().unwrap();
        clear_env();
        let cfg = load("BIND_HTTP=127.0.0.1:8080\nTOR_SOCKS=127.0.0.1:9050\n").unwrap();
        assert_eq!(cfg.tor_socks, Some("127.0.0.1:9050".into()));
    }

    #[test]
    fn defaults_when_optional_absent() {
        let _g = ENV_MUTEX.lock().unwrap();
        clear_env();
        let cfg = load("BIND_HTTP=127.0.0.1:8080\n").unwrap();
        assert_eq!(cfg.relay_url, DEFAULT_RELAY_URL);
        assert_eq!(cfg.relay_timeout, Duration::from_secs(10));
        assert!(cfg.tor_socks.is_none());
        assert!(cfg.verify_sig);
        assert!(cfg.bot_keys.is_empty());
        assert_eq!(cfg.quiz_channel, DEFAULT_QUIZ_CHANNEL);
        assert!(cfg.allowed_channels.is_none());
        assert!(cfg.denied_authors.is_none());
    }

    #[test]
    fn missing_required_fields_error() {
        let _g = ENV_MUTEX.lock().unwrap();
        clear_env();
        assert!(load("RELAY_URL=ws://x\n").is_err());
    }

    #[test]
    fn malformed_values_error() {
        let _g = ENV_MUTEX.lock().unwrap();
        clear_env();
        assert!(load("BIND_HTTP=127.0.0.1:8080\nRELAY_TIMEOUT_SECS=soon\n").is_err());
        clear_env();
        assert!(load("BIND_HTTP=127.0.0.1:8080\nBOT_KEYS=nokey\n").is_err());
        clear_env();
        let cfg = load("BIND_HTTP=127.0.0.1:8080\nBOT_KEYS=bot=zz\n").unwrap();
        assert!(cfg.signers().is_err());
    }

    #[test]
    fn bech32_keys_and_ids_are_accepted() {
        let _g = ENV_MUTEX.lock().unwrap();
        clear_env();
        let cfg = load(concat!(
            "BIND_HTTP=127.0.0.1:8080\n",
            "BOT_KEYS=rinrin=nsec1qyqszqgpqyqszqgpqyqszqgpqyqszqgpqyqszqgpqyqszqgpqyqstywftw\n",
            "ALLOWED_CHANNELS=note1er2uyuy62ecdda3p4jqzptp7flps27jfvxs4xx0hczqcxz2qwu3skxehs8\n",
            "DENIED_AUTHORS=npub1j0ng5hmm7mf47r939zqkpepwekenj6uqhd5x555pn80utevvavjsfgqem2,",
            "npub1rnrnclxznfkqqu8nnpt0mwp4hj0xe005mnwjqlafaluv7n2kn80sy53aq2\n",
        ))
        .unwrap();
        assert_eq!(
            cfg.allowed_channels,
            Some(vec![DEFAULT_QUIZ_CHANNEL.to_string()])
        );
        assert_eq!(
            cfg.denied_authors,
            Some(vec![
                crate::access::DEFAULT_DENIED_AUTHORS[0].to_string(),
                "1cc73c7cc29a6c0070f39856fdb835bc9e6cbdf4dcdd207fa9eff8cf4d5699df".to_string(),
            ])
        );
        let signers = cfg.signers().unwrap();
        assert_eq!(
            signers["rinrin"].public_key(),
            Signer::from_hex(KEY).unwrap().public_key()
        );

        clear_env();
        assert!(load("BIND_HTTP=127.0.0.1:8080\nDENIED_AUTHORS=nsec1qyqszqgpqyqszqgpqyqszqgpqyqszqgpqyqszqgpqyqszqgpqyqstywftw\n").is_err());
        clear_env();
        assert!(load("BIND_HTTP=127.0.0.1:8080\nALLOWED_CHANNELS=abcd\n").is_err());
    }

    #[test]
    fn list_overrides_reach_the_policy() {
        let _g = ENV_MUTEX.lock().unwrap();
        clear_env();
        let mine = "ab".repeat(32);
        let cfg = load(&format!("BIND_HTTP=127.0.0.1:8080\nALLOWED_CHANNELS={mine}\n")).unwrap();
        let ctx = cfg.context();
        let ev = Event {
            id: "ev".into(),
            pubkey: "alice".into(),
            created_at: 1,
            kind: 42,
            tags: vec![crate::event::Tag::new(["e", mine.as_str(), "", "root"])],
            content: String::new(),
            sig: String::new(),
        };
        assert!(ctx.policy.is_allowed(&ev).unwrap());
        let denied = Event {
            pubkey: crate::access::DEFAULT_DENIED_AUTHORS[0].into(),
            ..ev
        };
        assert!(!ctx.policy.is_allowed(&denied).unwrap());
        assert_eq!(ctx.quiz.channel, DEFAULT_QUIZ_CHANNEL);
    }
}
