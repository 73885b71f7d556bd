//! Finding audio on a rendered page and splicing players into it.
//!
//! Two kinds of elements become players: `<audio>` elements carrying a source
//! URL (a nested `<source src>` or their own `src`), and links whose resolved
//! URL ends in a known audio extension. Elements without a usable URL are
//! left alone. The scanner is a small tag lexer rather than a full HTML
//! parser; rendered documentation pages are well-formed enough for it and the
//! byte spans it reports let the page be rewritten in place.

use log::debug;
use serde::Serialize;
use std::ops::Range;
use url::Url;

use crate::constants::{AUDIO_EXTENSIONS, DEFAULT_PROGRESS_COLOR, DEFAULT_WAVE_COLOR, PLAYER_CLASS};
use crate::handle::PlaybackHandle;
use crate::panels::Panel;
use crate::widget::{Control, Player};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    AudioTag,
    Link,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioSource {
    pub url: String,
    pub description: Option<String>,
    pub kind: SourceKind,
    /// Byte range of the element in the page it was found in
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Theme {
    pub wave_color: String,
    pub progress_color: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            wave_color: DEFAULT_WAVE_COLOR.to_string(),
            progress_color: DEFAULT_PROGRESS_COLOR.to_string(),
        }
    }
}

impl Theme {
    /// Read `--wave-color` / `--progress-color` from the page's styles.
    ///
    /// The last declaration wins; unset or empty properties fall back to
    /// `fallback`.
    pub fn from_page(html: &str, fallback: &Theme) -> Self {
        let wave_color = css_custom_property(html, "--wave-color")
            .unwrap_or_else(|| fallback.wave_color.clone());
        let progress_color = css_custom_property(html, "--progress-color")
            .unwrap_or_else(|| fallback.progress_color.clone());
        Self {
            wave_color,
            progress_color,
        }
    }
}

fn css_custom_property(html: &str, name: &str) -> Option<String> {
    let mut found = None;
    let mut rest = html;

    while let Some(index) = rest.find(name) {
        let after = &rest[index + name.len()..];
        rest = after;

        let Some(value) = after.trim_start().strip_prefix(':') else {
            continue;
        };
        let end = value
            .find(|c| matches!(c, ';' | '}' | '"' | '\'' | '<'))
            .unwrap_or(value.len());
        let value = value[..end].trim();
        found = Some(value.to_string());
    }

    found.filter(|value| !value.is_empty())
}

#[derive(Debug, Clone)]
struct Tag {
    name: String,
    attrs: Vec<(String, String)>,
    closing: bool,
    start: usize,
    end: usize,
}

impl Tag {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn opens(&self, name: &str) -> bool {
        !self.closing && self.name == name
    }

    fn closes(&self, name: &str) -> bool {
        self.closing && self.name == name
    }
}

/// Lex every element tag in `html`, skipping comments, doctypes and the
/// bodies of `<script>` and `<style>`.
fn lex_tags(html: &str) -> Vec<Tag> {
    let lower = html.to_ascii_lowercase();
    let bytes = html.as_bytes();
    let mut tags = Vec::new();
    let mut pos = 0;

    while let Some(offset) = html[pos..].find('<') {
        let start = pos + offset;

        if lower[start..].starts_with("<!--") {
            pos = lower[start..]
                .find("-->")
                .map_or(html.len(), |end| start + end + 3);
            continue;
        }

        let Some(tag) = lex_tag(html, bytes, start) else {
            pos = start + 1;
            continue;
        };
        pos = tag.end;

        if !tag.closing && (tag.name == "script" || tag.name == "style") {
            let close = format!("</{}", tag.name);
            pos = lower[pos..].find(&close).map_or(html.len(), |end| pos + end);
        }

        tags.push(tag);
    }

    tags
}

fn lex_tag(html: &str, bytes: &[u8], start: usize) -> Option<Tag> {
    let mut i = start + 1;
    let closing = bytes.get(i) == Some(&b'/');
    if closing {
        i += 1;
    }

    let name_start = i;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-') {
        i += 1;
    }
    if i == name_start {
        return None;
    }
    let name = html[name_start..i].to_ascii_lowercase();

    let mut attrs = Vec::new();
    loop {
        while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
            i += 1;
        }
        match bytes.get(i) {
            None => return None,
            Some(b'>') => break,
            Some(_) => {}
        }

        let key_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/')
        {
            i += 1;
        }
        let key = html[key_start..i].to_ascii_lowercase();

        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let mut value = String::new();
        if bytes.get(i) == Some(&b'=') {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            let quote = bytes
                .get(i)
                .copied()
                .filter(|b| *b == b'"' || *b == b'\'');
            if let Some(quote) = quote {
                let value_start = i + 1;
                let value_end = html[value_start..]
                    .find(quote as char)
                    .map(|end| value_start + end)?;
                value = decode_entities(&html[value_start..value_end]);
                i = value_end + 1;
            } else {
                let value_start = i;
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                    i += 1;
                }
                value = decode_entities(&html[value_start..i]);
            }
        }

        if !key.is_empty() {
            attrs.push((key, value));
        }
    }

    Some(Tag {
        name,
        attrs,
        closing,
        start,
        end: i + 1,
    })
}

/// Locate every audio element and audio link, in document order.
pub fn find_audio_sources(html: &str, base_url: Option<&str>) -> Vec<AudioSource> {
    let tags = lex_tags(html);
    let mut sources = Vec::new();
    let mut i = 0;

    while i < tags.len() {
        let tag = &tags[i];

        if tag.opens("audio") {
            let close = tags[i + 1..]
                .iter()
                .position(|t| t.closes("audio"))
                .map(|offset| i + 1 + offset);
            let inner = match close {
                Some(close) => &tags[i + 1..close],
                None => &tags[i + 1..i + 1],
            };

            let src = inner
                .iter()
                .filter(|t| t.opens("source"))
                .find_map(|t| t.attr("src").filter(|s| !s.trim().is_empty()))
                .or_else(|| tag.attr("src").filter(|s| !s.trim().is_empty()));

            let end = close.map_or(tag.end, |close| tags[close].end);
            match src {
                Some(src) => sources.push(AudioSource {
                    url: resolve_url(src.trim(), base_url),
                    description: None,
                    kind: SourceKind::AudioTag,
                    span: tag.start..end,
                }),
                None => debug!("Skipping <audio> at byte {} without a source", tag.start),
            }

            i = close.map_or(i + 1, |close| close + 1);
            continue;
        }

        if tag.opens("a")
            && let Some(href) = tag.attr("href")
            && let Some(close) = tags[i + 1..].iter().position(|t| t.closes("a"))
        {
            let close = i + 1 + close;
            let resolved = resolve_url(href.trim(), base_url);
            let lowered = resolved.to_lowercase();

            if AUDIO_EXTENSIONS.iter().any(|ext| lowered.ends_with(ext)) {
                let text = text_content(&html[tag.end..tags[close].start]);
                sources.push(AudioSource {
                    url: resolved.replacen("#/", "", 1),
                    description: (!text.is_empty()).then_some(text),
                    kind: SourceKind::Link,
                    span: tag.start..tags[close].end,
                });
                i = close + 1;
                continue;
            }
        }

        i += 1;
    }

    sources
}

/// Resolve `href` against `base` the way a browser resolves `link.href`.
/// Without a usable base the href is returned unchanged.
pub fn resolve_url(href: &str, base: Option<&str>) -> String {
    let Some(base) = base.and_then(|b| Url::parse(b).ok()) else {
        return href.to_string();
    };
    match base.join(href) {
        Ok(resolved) => resolved.to_string(),
        Err(e) => {
            debug!("Keeping unresolvable link {href:?}: {e}");
            href.to_string()
        }
    }
}

/// Text of an element body: tags dropped, entities decoded, whitespace folded
fn text_content(fragment: &str) -> String {
    let mut text = String::with_capacity(fragment.len());
    let mut in_tag = false;
    for c in fragment.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    decode_entities(&text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp..];
        let decoded = candidate.find(';').filter(|&end| end <= 10).and_then(|end| {
            let entity = &candidate[1..end];
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" | "#39" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            c.map(|c| (c, end))
        });

        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &candidate[end + 1..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Stable container id for the `index`-th player of a page
pub fn player_id(url: &str, index: usize) -> String {
    let digest = md5::compute(format!("{index}:{url}").as_bytes());
    format!("{PLAYER_CLASS}-{:x}", digest)[..PLAYER_CLASS.len() + 13].to_string()
}

fn display(shown: bool) -> &'static str {
    if shown { "flex" } else { "none" }
}

fn button<H: PlaybackHandle>(player: &Player<H>, control: Control, glyph: &str) -> String {
    let highlight = if player.is_highlighted(control) {
        " background-color: lightblue;"
    } else {
        ""
    };
    format!(
        r#"<button type="button" data-control="{}" aria-pressed="{}" style="margin: 0 5px; background: white; border: 1px solid black; border-radius: 4px; cursor: pointer; padding: 5px;{highlight}">{glyph}</button>"#,
        control.name(),
        player.is_highlighted(control),
    )
}

/// Markup for one player, reflecting its current panel and session state
pub fn render_player<H: PlaybackHandle>(player: &Player<H>, theme: &Theme) -> String {
    let session = player.session();
    let panels = player.panels();
    let mut html = String::new();

    html.push_str(&format!(
        r#"<div class="{PLAYER_CLASS}" id="{}" data-src="{}" data-wave-color="{}" data-progress-color="{}" style="margin: 10px 0;">"#,
        escape_html(player.id()),
        escape_html(&player.source().url),
        escape_html(&theme.wave_color),
        escape_html(&theme.progress_color),
    ));
    html.push_str(r#"<div class="docwave-wrapper" style="position: relative;">"#);

    if let Some(description) = player.description() {
        let highlight = if player.is_highlighted(Control::Label) {
            "rgba(173, 216, 230, 0.9)"
        } else {
            "rgba(255, 255, 255, 0.7)"
        };
        html.push_str(&format!(
            r#"<div class="docwave-label" data-control="{}" role="button" style="position: absolute; top: 0; left: 0; font-weight: bold; background-color: {highlight}; color: black; padding: 5px; z-index: 10; cursor: pointer;">{}</div>"#,
            Control::Label.name(),
            escape_html(description),
        ));
    }

    html.push_str(r#"<div class="docwave-waveform"></div>"#);
    html.push_str(
        r#"<div class="docwave-controls" style="display: flex; flex-direction: column; align-items: center; margin-top: 10px;">"#,
    );

    html.push_str(
        r#"<div class="docwave-transport" style="display: flex; justify-content: center; margin-bottom: 10px;">"#,
    );
    html.push_str(&button(
        player,
        Control::PlayPause,
        session.state().play_button.icon.glyph(),
    ));
    html.push_str(&button(
        player,
        Control::ToolbarToggle,
        Control::ToolbarToggle.glyph(),
    ));
    html.push_str(&format!(
        r#"<div class="docwave-toolbar" style="display: {};">"#,
        display(panels.is_shown(Panel::Toolbar))
    ));
    for control in Control::TOOLBAR {
        html.push_str(&button(player, control, control.glyph()));
    }
    html.push_str("</div></div>");

    html.push_str(&format!(
        r#"<div class="docwave-speed" style="display: {}; align-items: center; margin-bottom: 10px;">"#,
        display(panels.is_shown(Panel::Speed))
    ));
    html.push_str(&button(player, Control::SpeedReset, Control::SpeedReset.glyph()));
    html.push_str(&format!(
        r#"<input type="range" min="0" max="100" step="1" value="{}" style="margin: 0 10px;"><span class="docwave-speed-readout">{}</span></div>"#,
        session.speed_slider(),
        escape_html(session.speed_readout().text()),
    ));

    html.push_str(&format!(
        r#"<div class="docwave-volume" style="display: {}; align-items: center;">"#,
        display(panels.is_shown(Panel::Volume))
    ));
    html.push_str(&button(player, Control::VolumeReset, Control::VolumeReset.glyph()));
    html.push_str(&format!(
        r#"<input type="range" min="0" max="1" step="0.01" value="{}" style="margin: 0 10px;"><span class="docwave-volume-readout" style="width: 40px; display: inline-block;">{}</span></div>"#,
        session.volume_slider(),
        escape_html(session.volume_readout().text()),
    ));

    html.push_str(&format!(
        r#"<div class="docwave-time" style="display: {}; align-items: center;"><span class="docwave-elapsed">{}</span> / <span class="docwave-total">{}</span></div>"#,
        display(panels.is_shown(Panel::TimeRatio)),
        escape_html(session.elapsed_readout().text()),
        escape_html(session.total_readout().text()),
    ));

    html.push_str("</div></div></div>");
    html
}

/// Replace byte ranges of `html`; ranges must be sorted and disjoint
pub fn splice(html: &str, replacements: &[(Range<usize>, String)]) -> String {
    let mut out = String::with_capacity(html.len());
    let mut cursor = 0;
    for (range, text) in replacements {
        out.push_str(&html[cursor..range.start]);
        out.push_str(text);
        cursor = range.end;
    }
    out.push_str(&html[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_with_nested_source() {
        let html = r#"<p>Listen:</p><audio controls><source src="clip.ogg" type="audio/ogg"></audio>"#;
        let sources = find_audio_sources(html, None);

        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].url, "clip.ogg");
        assert_eq!(sources[0].kind, SourceKind::AudioTag);
        assert_eq!(&html[sources[0].span.clone()], &html[14..]);
        assert!(sources[0].description.is_none());
    }

    #[test]
    fn test_audio_without_source_is_skipped() {
        let html = "<audio controls></audio><audio><source type=\"audio/mp3\"></audio>";
        assert!(find_audio_sources(html, None).is_empty());
    }

    #[test]
    fn test_audio_src_attribute_fallback() {
        let html = r#"<audio src="/a/b.wav"></audio>"#;
        let sources = find_audio_sources(html, Some("https://docs.example.com/guide/"));
        assert_eq!(sources[0].url, "https://docs.example.com/a/b.wav");
    }

    #[test]
    fn test_audio_link_with_description() {
        let html = r#"<p>See <a href="media/Take1.MP3">First <em>take</em> &amp; more</a>.</p>"#;
        let sources = find_audio_sources(html, None);

        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].kind, SourceKind::Link);
        assert_eq!(sources[0].url, "media/Take1.MP3");
        assert_eq!(sources[0].description.as_deref(), Some("First take & more"));
    }

    #[test]
    fn test_non_audio_links_ignored() {
        let html = r#"<a href="guide.html">Guide</a><a href="song.mp3.html">Not audio</a><a name="x">anchor</a>"#;
        assert!(find_audio_sources(html, None).is_empty());
    }

    #[test]
    fn test_every_extension_matches() {
        for ext in AUDIO_EXTENSIONS {
            let html = format!(r#"<a href="file{}">x</a>"#, ext.to_uppercase());
            assert_eq!(find_audio_sources(&html, None).len(), 1, "{ext}");
        }
    }

    #[test]
    fn test_hash_route_is_stripped() {
        let html = r##"<a href="#/media/loop.flac">Loop</a>"##;
        let sources = find_audio_sources(html, Some("https://site.test/"));
        assert_eq!(sources[0].url, "https://site.test/media/loop.flac");
    }

    #[test]
    fn test_document_order() {
        let html = r#"<a href="one.mp3">1</a><audio><source src="two.wav"></audio><a href="three.opus">3</a>"#;
        let urls: Vec<String> = find_audio_sources(html, None)
            .into_iter()
            .map(|s| s.url)
            .collect();
        assert_eq!(urls, vec!["one.mp3", "two.wav", "three.opus"]);
    }

    #[test]
    fn test_script_and_comment_bodies_ignored() {
        let html = r#"<!-- <a href="x.mp3">x</a> --><script>var s = '<a href="y.mp3">y</a>';</script><a href="z.mp3">z</a>"#;
        let sources = find_audio_sources(html, None);
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].url, "z.mp3");
    }

    #[test]
    fn test_resolve_url() {
        let base = Some("https://docs.test/guide/intro.html?x=1#top");
        assert_eq!(resolve_url("a.mp3", base), "https://docs.test/guide/a.mp3");
        assert_eq!(resolve_url("../a.mp3", base), "https://docs.test/a.mp3");
        assert_eq!(resolve_url("./sub/a.mp3", base), "https://docs.test/guide/sub/a.mp3");
        assert_eq!(resolve_url("/root.mp3", base), "https://docs.test/root.mp3");
        assert_eq!(resolve_url("//cdn.test/a.mp3", base), "https://cdn.test/a.mp3");
        assert_eq!(resolve_url("http://other.test/a.mp3", base), "http://other.test/a.mp3");
        assert_eq!(
            resolve_url("#/a.mp3", base),
            "https://docs.test/guide/intro.html?x=1#/a.mp3"
        );
        assert_eq!(resolve_url("a.mp3", None), "a.mp3");
    }

    #[test]
    fn test_resolve_url_matches_browser_href() {
        let base = Some("https://docs.test/guide/x/");
        assert_eq!(
            resolve_url("my take.mp3", base),
            "https://docs.test/guide/x/my%20take.mp3"
        );
        assert_eq!(resolve_url("..\\a.mp3", base), "https://docs.test/guide/a.mp3");
        assert_eq!(resolve_url("https:a.mp3", base), "https://docs.test/guide/x/a.mp3");
    }

    #[test]
    fn test_resolve_url_without_usable_base() {
        assert_eq!(
            resolve_url("//cdn.test/a.mp3", Some("docs/guide/")),
            "//cdn.test/a.mp3"
        );
        assert_eq!(resolve_url("a.mp3", Some("")), "a.mp3");
    }

    #[test]
    fn test_theme_from_page() {
        let html = "<style>:root { --wave-color: #123456; --progress-color: ; }</style>";
        let theme = Theme::from_page(html, &Theme::default());
        assert_eq!(theme.wave_color, "#123456");
        assert_eq!(theme.progress_color, DEFAULT_PROGRESS_COLOR);
    }

    #[test]
    fn test_theme_last_declaration_wins() {
        let html = r#"<style>:root{--wave-color:red}</style><html style="--wave-color: blue">"#;
        let theme = Theme::from_page(html, &Theme::default());
        assert_eq!(theme.wave_color, "blue");
        assert_eq!(theme.progress_color, DEFAULT_PROGRESS_COLOR);
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &lt;b&gt; &#65;&#x42; &unknown; & c"), "a <b> AB &unknown; & c");
    }

    #[test]
    fn test_splice() {
        let html = "0123456789";
        let out = splice(html, &[(1..3, "ab".to_string()), (5..9, "X".to_string())]);
        assert_eq!(out, "0ab34X9");
    }

    #[test]
    fn test_player_id_is_stable() {
        let a = player_id("a.mp3", 0);
        assert_eq!(a, player_id("a.mp3", 0));
        assert_ne!(a, player_id("a.mp3", 1));
        assert!(a.starts_with("docwave-player-"));
    }
}
