//! Tag construction for replies, reactions and emoji.

use crate::{
    emoji::EmojiCodec,
    error::Result,
    event::{Event, Tag},
    mahjong::Tile,
};

/// Thread tags for a reply to `event`.
///
/// An existing root tag is reused verbatim and followed by a reply marker for
/// `event`; otherwise `event` becomes the root. Participants other than the
/// author keep their input order and the author is always mentioned last.
pub fn thread_tags(event: &Event) -> Vec<Tag> {
    let mut tags = Vec::new();
    match event.root_tag() {
        Some(root) => {
            tags.push(root.clone());
            tags.push(Tag::new(["e", event.id.as_str(), "", "reply"]));
        }
        None => tags.push(Tag::new(["e", event.id.as_str(), "", "root"])),
    }
    let others = event.tags.iter().filter(|t| {
        t.len() >= 2 && t.kind() == Some("p") && t.get(1) != Some(event.pubkey.as_str())
    });
    tags.extend(others.cloned());
    tags.push(Tag::new(["p", event.pubkey.as_str(), ""]));
    tags
}

/// Tags of a reaction to `event` (NIP-25).
pub fn fav_tags(event: &Event) -> Vec<Tag> {
    vec![
        Tag::new(["e", event.id.as_str(), "", "", event.pubkey.as_str()]),
        Tag::new(["p", event.pubkey.as_str(), ""]),
        Tag::new(["k".to_string(), event.kind.to_string()]),
    ]
}

/// One `emoji` tag per distinct tile, in order of first appearance.
pub fn emoji_tags(codec: &EmojiCodec, tiles: &[Tile]) -> Result<Vec<Tag>> {
    let mut seen = Vec::new();
    for tile in tiles {
        if !seen.contains(tile) {
            seen.push(*tile);
        }
    }
    seen.into_iter()
        .map(|tile| {
            let code = EmojiCodec::shortcode(tile);
            let url = codec.url(&code)?.to_string();
            Ok(Tag(vec!["emoji".into(), code, url]))
        })
        .collect()
}
