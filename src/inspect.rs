//! Read rendered PDF bytes back with `lopdf` to verify page count and page
//! geometry.

use lopdf::{Dictionary, Document, Object};

use crate::error::InspectError;

/// Size of one rendered page in PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl PageGeometry {
    pub fn matches(&self, width_pt: f32, height_pt: f32, tolerance: f32) -> bool {
        (self.width_pt - width_pt).abs() <= tolerance && (self.height_pt - height_pt).abs() <= tolerance
    }
}

/// Geometry of every page, in page order.
pub fn page_geometry(pdf: &[u8]) -> Result<Vec<PageGeometry>, InspectError> {
    let doc = Document::load_mem(pdf)?;
    doc.get_pages()
        .into_iter()
        .map(|(number, id)| {
            let page = doc.get_dictionary(id)?;
            media_box(&doc, page)?.ok_or(InspectError::MediaBox {
                page: number as usize,
            })
        })
        .collect()
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Result<&'a Object, lopdf::Error> {
    match obj {
        Object::Reference(id) => doc.get_object(*id),
        other => Ok(other),
    }
}

/// The page's MediaBox, inherited from the page tree when absent. `None`
/// when the box is not four numbers.
fn media_box(doc: &Document, page: &Dictionary) -> Result<Option<PageGeometry>, lopdf::Error> {
    let mut dict = page;
    loop {
        if let Ok(obj) = dict.get(b"MediaBox") {
            let values = resolve(doc, obj)?
                .as_array()?
                .iter()
                .map(|v| resolve(doc, v).and_then(Object::as_float))
                .collect::<Result<Vec<f32>, _>>()?;
            return Ok(match values[..] {
                [llx, lly, urx, ury] => Some(PageGeometry {
                    width_pt: (urx - llx).abs(),
                    height_pt: (ury - lly).abs(),
                }),
                _ => None,
            });
        }
        let parent = dict.get(b"Parent")?.as_reference()?;
        dict = doc.get_dictionary(parent)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout_config::{LayoutConfig, PageLayout};
    use crate::render::render_pdf;

    #[test]
    fn reads_back_rendered_geometry() {
        let mut config = LayoutConfig::new(1280.0, 720.0);
        for i in 0..3 {
            config.pages.push(PageLayout {
                page_index: i,
                boxes: Vec::new(),
            });
        }
        let pages = page_geometry(&render_pdf(&config)).unwrap();
        assert_eq!(pages.len(), 3);
        assert!(pages.iter().all(|p| p.matches(960.0, 540.0, 0.5)), "{pages:?}");
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(page_geometry(b"not a pdf").is_err());
    }
}
