//! RSS 2.0 serialization of archived items.

use std::io::Cursor;

use chrono::Utc;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::app::{MirrorError, Result};
use crate::domain::{FeedMeta, ItemRecord};

const GENERATOR: &str = concat!("feedmirror ", env!("CARGO_PKG_VERSION"));

type XmlWriter = Writer<Cursor<Vec<u8>>>;

/// Render `meta` and `items` as an RSS 2.0 document.
///
/// Each item is paired with its archive identifier, which becomes the
/// `<guid>` when the record carries none of its own.
pub fn render_rss(meta: &FeedMeta, items: &[(String, ItemRecord)]) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    write_event(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    write_event(&mut writer, Event::Start(rss))?;
    write_event(&mut writer, Event::Start(BytesStart::new("channel")))?;

    write_text_element(&mut writer, "title", &meta.title)?;
    write_text_element(&mut writer, "link", &meta.link)?;
    write_text_element(&mut writer, "description", &meta.description)?;
    write_text_element(&mut writer, "generator", GENERATOR)?;
    write_text_element(&mut writer, "lastBuildDate", &Utc::now().to_rfc2822())?;

    for (id, item) in items {
        write_item(&mut writer, id, item)?;
    }

    write_event(&mut writer, Event::End(BytesEnd::new("channel")))?;
    write_event(&mut writer, Event::End(BytesEnd::new("rss")))?;

    Ok(writer.into_inner().into_inner())
}

fn write_item(writer: &mut XmlWriter, id: &str, item: &ItemRecord) -> Result<()> {
    write_event(writer, Event::Start(BytesStart::new("item")))?;

    if let Some(ref title) = item.title {
        write_text_element(writer, "title", title)?;
    }
    if let Some(ref link) = item.link {
        write_text_element(writer, "link", link)?;
    }
    if let Some(ref description) = item.description {
        write_text_element(writer, "description", description)?;
    }

    let mut guid = BytesStart::new("guid");
    guid.push_attribute(("isPermaLink", "false"));
    write_event(writer, Event::Start(guid))?;
    write_event(
        writer,
        Event::Text(BytesText::new(item.guid.as_deref().unwrap_or(id))),
    )?;
    write_event(writer, Event::End(BytesEnd::new("guid")))?;

    if let Some(date) = item.date {
        write_text_element(writer, "pubDate", &date.to_rfc2822())?;
    }

    write_event(writer, Event::End(BytesEnd::new("item")))
}

fn write_text_element(writer: &mut XmlWriter, name: &str, text: &str) -> Result<()> {
    write_event(writer, Event::Start(BytesStart::new(name)))?;
    write_event(writer, Event::Text(BytesText::new(text)))?;
    write_event(writer, Event::End(BytesEnd::new(name)))
}

fn write_event(writer: &mut XmlWriter, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| MirrorError::Export(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_item(i: usize) -> (String, ItemRecord) {
        let mut item = ItemRecord::with_title(format!("entry{}", i));
        item.description = Some(format!("desc{}", i));
        item.link = Some(format!("http://example.com/{}", i));
        item.guid = Some(format!("id-{}", i));
        item.date = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        (format!("id-{}", i), item)
    }

    #[test]
    fn test_rendered_feed_parses_back() {
        let meta = FeedMeta::new("test feed", "http://example.com", "http://example.com");
        let items: Vec<_> = (0..3).map(sample_item).collect();

        let xml = render_rss(&meta, &items).unwrap();
        let feed = feed_rs::parser::parse(&xml[..]).unwrap();

        assert_eq!(feed.title.unwrap().content, "test feed");
        assert_eq!(feed.entries.len(), 3);
        assert_eq!(feed.entries[0].id, "id-0");
        assert_eq!(feed.entries[2].title.as_ref().unwrap().content, "entry2");
        assert!(feed.entries[0].published.is_some());
    }

    #[test]
    fn test_special_characters_are_escaped() {
        let meta = FeedMeta::new("Fish & <Chips>", "", "");
        let xml = render_rss(&meta, &[]).unwrap();
        let text = String::from_utf8(xml).unwrap();

        assert!(text.contains("Fish &amp; &lt;Chips&gt;"));
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    }

    #[test]
    fn test_identifier_used_when_guid_missing() {
        let item = ItemRecord::with_title("moo");
        let xml = render_rss(&FeedMeta::default(), &[("abc123".to_string(), item)]).unwrap();
        let text = String::from_utf8(xml).unwrap();
        assert!(text.contains("<guid isPermaLink=\"false\">abc123</guid>"));
    }
}
