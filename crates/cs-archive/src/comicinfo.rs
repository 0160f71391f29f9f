//! `ComicInfo.xml` parsing.
//!
//! Only the fields the indexer uses are mapped. Numeric fields are read as
//! text and parsed leniently: ComicRack writes `-1` for "unknown", and
//! hand-edited files often carry stray whitespace.

use serde::Deserialize;

use cs_core::EmbeddedMetadata;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct ComicInfoXml {
    series: Option<String>,
    number: Option<String>,
    title: Option<String>,
    volume: Option<String>,
    year: Option<String>,
    summary: Option<String>,
    page_count: Option<String>,
    pages: Option<PagesXml>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PagesXml {
    #[serde(rename = "Page")]
    page: Vec<PageXml>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageXml {
    #[serde(rename = "@Image")]
    image: Option<String>,
    #[serde(rename = "@Type")]
    kind: Option<String>,
}

/// Parse a ComicInfo document into [`EmbeddedMetadata`].
pub fn parse(xml: &str) -> Result<EmbeddedMetadata, quick_xml::DeError> {
    let doc: ComicInfoXml = quick_xml::de::from_str(xml.trim_start_matches('\u{feff}'))?;

    let cover_page = doc.pages.as_ref().and_then(|pages| {
        pages
            .page
            .iter()
            .find(|p| {
                p.kind
                    .as_deref()
                    .is_some_and(|k| k.trim().eq_ignore_ascii_case("FrontCover"))
            })
            .and_then(|p| p.image.as_deref())
            .and_then(|i| i.trim().parse::<u32>().ok())
    });

    Ok(EmbeddedMetadata {
        series: text(doc.series),
        number: text(doc.number),
        title: text(doc.title),
        volume: positive(doc.volume),
        year: positive(doc.year),
        summary: text(doc.summary),
        page_count: positive(doc.page_count),
        cover_page,
    })
}

fn text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|v| !v.is_empty())
}

fn positive<T>(value: Option<String>) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    value
        .and_then(|v| v.trim().parse::<T>().ok())
        .filter(|v| *v > T::default())
}
