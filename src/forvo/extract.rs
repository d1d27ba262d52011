//! Extraction of playable audio from Forvo's HTML.
//!
//! Everything that depends on Forvo's current markup lives here. The word page groups
//! pronunciations by language:
//!
//! ```text
//! <div id="language-container-ja">
//!   <article>
//!     <ul class="pronunciations-list">
//!       <li>
//!         <div class="play" onclick="Play(786514,'OTA3...',...);return false;"></div>
//!         Pronunciation by <span><a href="/user/skent/">skent</a></span> (Male from Japan)
//!       </li>
//!       <li class="li-ad">...</li>
//!     </ul>
//!   </article>
//! </div>
//! ```
//!
//! The search page is a flat `ul.word-play-list-icon-size-l > li > div.play` list.

use base64::Engine;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

/// A pronunciation entry found on a word page.
#[derive(Debug, Clone, PartialEq)]
pub struct Pronunciation {
    pub audio_url: String,
    pub contributor: Option<String>,
}

fn parse(html: &str) -> RcDom {
    parse_document(RcDom::default(), Default::default()).one(html)
}

fn node_name(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.to_string()),
        _ => None,
    }
}

fn node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == attr_name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

fn has_class(node: &Handle, class: &str) -> bool {
    node_attr(node, "class")
        .map(|classes| classes.split_ascii_whitespace().any(|c| c == class))
        .unwrap_or(false)
}

fn is_element(node: &Handle, tag: &str) -> bool {
    node_name(node).as_deref() == Some(tag)
}

/// Direct element children with the given tag name.
fn children_named(node: &Handle, tag: &str) -> Vec<Handle> {
    node.children
        .borrow()
        .iter()
        .filter(|child| is_element(child, tag))
        .cloned()
        .collect()
}

/// All descendants (document order) matching a predicate.
fn find_all<F>(node: &Handle, pred: &F) -> Vec<Handle>
where
    F: Fn(&Handle) -> bool,
{
    let mut found = Vec::new();
    for child in node.children.borrow().iter() {
        if pred(child) {
            found.push(child.clone());
        }
        found.append(&mut find_all(child, pred));
    }
    found
}

/// First descendant element with the given tag name, depth first.
fn first_descendant(node: &Handle, tag: &str) -> Option<Handle> {
    for child in node.children.borrow().iter() {
        if is_element(child, tag) {
            return Some(child.clone());
        }
        if let Some(found) = first_descendant(child, tag) {
            return Some(found);
        }
    }
    None
}

/// Text of all descendant text nodes, each trimmed, concatenated without separators.
fn stripped_text(node: &Handle) -> String {
    let mut text = String::new();
    collect_text(node, &mut text);
    text
}

fn collect_text(node: &Handle, out: &mut String) {
    if let NodeData::Text { contents } = &node.data {
        out.push_str(contents.borrow().trim());
    }
    for child in node.children.borrow().iter() {
        collect_text(child, out);
    }
}

/// Decode the audio URL out of a `Play(id,'<base64 mp3 path>',...)` click handler.
///
/// Forvo serves each clip from both `/audios/mp3` and `/mp3`; the second `Play` argument
/// is the base64-encoded `/mp3` path.
pub fn play_url(onclick: &str, audio_host: &str) -> Option<String> {
    let encoded = onclick
        .split(['\'', ',', '(', ')'])
        .filter(|token| !token.is_empty())
        .nth(2)?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let file = String::from_utf8(decoded).ok()?;
    if file.is_empty() {
        return None;
    }
    Some(format!("{audio_host}/mp3/{file}"))
}

/// Contributor name from an entry's text, e.g. `Pronunciation byskent(Male from Japan)`.
pub fn contributor(text: &str) -> Option<String> {
    let (_, rest) = text.split_once("Pronunciation by")?;
    let (name, _) = rest.split_once('(')?;
    let name = name.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Non-ad pronunciations for `language` on a word page, in page order.
pub fn word_pronunciations(html: &str, language: &str, audio_host: &str) -> Vec<Pronunciation> {
    let dom = parse(html);
    let container_id = format!("language-container-{language}");
    let containers = find_all(&dom.document, &|node: &Handle| {
        node_attr(node, "id").as_deref() == Some(container_id.as_str())
    });

    let mut pronunciations = Vec::new();
    for container in &containers {
        for article in children_named(container, "article") {
            for list in children_named(&article, "ul") {
                if !has_class(&list, "pronunciations-list") {
                    continue;
                }
                for entry in children_named(&list, "li") {
                    if has_class(&entry, "li-ad") {
                        continue;
                    }
                    let audio_url = first_descendant(&entry, "div")
                        .and_then(|div| node_attr(&div, "onclick"))
                        .and_then(|onclick| play_url(&onclick, audio_host));
                    let Some(audio_url) = audio_url else {
                        tracing::debug!(language, "Skipping pronunciation without playable audio");
                        continue;
                    };
                    pronunciations.push(Pronunciation {
                        audio_url,
                        contributor: contributor(&stripped_text(&entry)),
                    });
                }
            }
        }
    }
    pronunciations
}

/// Audio URLs listed on a search page, in page order.
pub fn search_pronunciations(html: &str, audio_host: &str) -> Vec<String> {
    let dom = parse(html);
    let lists = find_all(&dom.document, &|node: &Handle| {
        is_element(node, "ul") && has_class(node, "word-play-list-icon-size-l")
    });

    lists
        .iter()
        .flat_map(|list| children_named(list, "li"))
        .flat_map(|entry| children_named(&entry, "div"))
        .filter(|div| has_class(div, "play"))
        .filter_map(|div| node_attr(&div, "onclick"))
        .filter_map(|onclick| play_url(&onclick, audio_host))
        .collect()
}
