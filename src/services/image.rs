//! Embed jpeg images into pdf pages without re-encoding them
use lopdf::{dictionary, Document, Object, Stream};

use super::pdf::{save, PdfError};

/// Resolution assumed when a jpeg doesn't carry one
const DEFAULT_DPI: f64 = 96.0;

/// What a pdf needs to know about a jpeg
#[derive(Debug, Clone, PartialEq)]
pub struct JpegInfo {
  pub(crate) width: u16,
  pub(crate) height: u16,
  pub(crate) components: u8,
  pub(crate) bits_per_component: u8,
  pub(crate) dpi: (f64, f64),
  pub(crate) adobe: bool,
}

fn read_u16(data: &[u8], offset: usize) -> Option<u16> {
  let bytes = data.get(offset..offset + 2)?;
  Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

fn is_start_of_frame(marker: u8) -> bool {
  matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC)
}

impl JpegInfo {
  /// # Parse jpeg headers
  /// Walk the marker segments until the start of frame.
  /// Return None when the data is not a jpeg or is truncated.
  pub fn parse(data: &[u8]) -> Option<JpegInfo> {
    if !data.starts_with(&[0xFF, 0xD8]) {
      return None;
    }
    let mut dpi = None;
    let mut adobe = false;
    let mut offset = 2;
    loop {
      if *data.get(offset)? != 0xFF {
        return None;
      }
      let marker = *data.get(offset + 1)?;
      // Fill bytes and standalone markers have no length
      if marker == 0xFF {
        offset += 1;
        continue;
      }
      if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
        offset += 2;
        continue;
      }
      if marker == 0xD9 || marker == 0xDA {
        return None;
      }
      let length = read_u16(data, offset + 2)? as usize;
      if length < 2 {
        return None;
      }
      let segment = data.get(offset + 4..offset + 2 + length)?;
      match marker {
        0xE0 if segment.starts_with(b"JFIF\0") && segment.len() >= 12 => {
          let x = read_u16(segment, 8)? as f64;
          let y = read_u16(segment, 10)? as f64;
          dpi = match segment[7] {
            1 if x > 0.0 && y > 0.0 => Some((x, y)),
            2 if x > 0.0 && y > 0.0 => Some((x * 2.54, y * 2.54)),
            _ => None,
          };
        }
        0xEE if segment.starts_with(b"Adobe") => adobe = true,
        marker if is_start_of_frame(marker) => {
          let bits_per_component = *segment.first()?;
          let height = read_u16(segment, 1)?;
          let width = read_u16(segment, 3)?;
          let components = *segment.get(5)?;
          if width == 0 || height == 0 || ![1, 3, 4].contains(&components) {
            return None;
          }
          return Some(JpegInfo {
            width,
            height,
            components,
            bits_per_component,
            dpi: dpi.unwrap_or((DEFAULT_DPI, DEFAULT_DPI)),
            adobe,
          });
        }
        _ => {}
      }
      offset += 2 + length;
    }
  }

  /// Page size in points
  pub fn page_size(&self) -> (f64, f64) {
    (
      f64::from(self.width) * 72.0 / self.dpi.0,
      f64::from(self.height) * 72.0 / self.dpi.1,
    )
  }

  fn color_space(&self) -> &'static str {
    match self.components {
      1 => "DeviceGray",
      4 => "DeviceCMYK",
      _ => "DeviceRGB",
    }
  }
}

/// # Images to pdf
/// Build a pdf with one page per jpeg, each page has the size of his image
///
/// # Arguments
/// - [images](Vec) name of the image and his jpeg content
pub fn jpegs_to_pdf(images: Vec<(String, Vec<u8>)>) -> Result<Vec<u8>, PdfError> {
  let mut doc = Document::with_version("1.5");
  let pages_id = doc.new_object_id();
  let mut kids = Vec::with_capacity(images.len());
  for (name, data) in images {
    let info = JpegInfo::parse(&data).ok_or(PdfError::InvalidImage(name))?;
    let (width, height) = info.page_size();
    let mut image = dictionary! {
      "Type" => "XObject",
      "Subtype" => "Image",
      "Width" => i64::from(info.width),
      "Height" => i64::from(info.height),
      "ColorSpace" => info.color_space(),
      "BitsPerComponent" => i64::from(info.bits_per_component),
      "Filter" => "DCTDecode",
    };
    // Adobe stores cmyk inverted
    if info.components == 4 && info.adobe {
      image.set(
        "Decode",
        [1, 0, 1, 0, 1, 0, 1, 0]
          .iter()
          .map(|value| Object::Integer(*value))
          .collect::<Vec<Object>>(),
      );
    }
    let image_id = doc.add_object(Stream::new(image, data));
    let content = format!("q {:.4} 0 0 {:.4} 0 0 cm /Im0 Do Q\n", width, height);
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
    let page_id = doc.add_object(dictionary! {
      "Type" => "Page",
      "Parent" => pages_id,
      "MediaBox" => vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Real(width as _),
        Object::Real(height as _),
      ],
      "Resources" => dictionary! {
        "XObject" => dictionary! {
          "Im0" => image_id,
        },
      },
      "Contents" => content_id,
    });
    kids.push(Object::Reference(page_id));
  }
  if kids.is_empty() {
    return Err(PdfError::NoPages);
  }
  let count = kids.len() as i64;
  doc.objects.insert(
    pages_id,
    Object::Dictionary(dictionary! {
      "Type" => "Pages",
      "Kids" => kids,
      "Count" => count,
    }),
  );
  let catalog_id = doc.add_object(dictionary! {
    "Type" => "Catalog",
    "Pages" => pages_id,
  });
  doc.trailer.set("Root", catalog_id);
  save(&mut doc)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::services::pdf::load;
  use crate::utils::tests::gen_jpeg;

  #[test]
  fn parse_jfif_headers() {
    let info = JpegInfo::parse(&gen_jpeg(640, 480, 3, Some(300))).unwrap();
    assert_eq!(info.width, 640);
    assert_eq!(info.height, 480);
    assert_eq!(info.components, 3);
    assert_eq!(info.bits_per_component, 8);
    assert_eq!(info.dpi, (300.0, 300.0));
    let (width, height) = info.page_size();
    assert!((width - 153.6).abs() < 0.001);
    assert!((height - 115.2).abs() < 0.001);
  }

  #[test]
  fn default_resolution() {
    let info = JpegInfo::parse(&gen_jpeg(96, 192, 1, None)).unwrap();
    assert_eq!(info.dpi, (96.0, 96.0));
    assert_eq!(info.page_size(), (72.0, 144.0));
    assert_eq!(info.color_space(), "DeviceGray");
  }

  #[test]
  fn reject_non_jpeg() {
    assert!(JpegInfo::parse(b"\x89PNG\r\n\x1a\n").is_none());
    assert!(JpegInfo::parse(&[0xFF, 0xD8, 0xFF, 0xD9]).is_none());
    let truncated = gen_jpeg(10, 10, 3, None);
    assert!(JpegInfo::parse(&truncated[..8]).is_none());
  }

  #[test]
  fn one_page_per_image() {
    let data = jpegs_to_pdf(vec![
      (String::from("a.jpg"), gen_jpeg(100, 50, 3, Some(72))),
      (String::from("b.jpg"), gen_jpeg(20, 40, 4, Some(72))),
    ])
    .unwrap();
    let doc = load(&data).unwrap();
    let pages = doc.get_pages();
    assert_eq!(pages.len(), 2);
    let page_id = *pages.get(&1).unwrap();
    let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
    let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
    assert_eq!(media_box.len(), 4);
  }

  /// Insert an APP14 Adobe segment right after the start of image
  fn with_adobe_segment(jpeg: Vec<u8>) -> Vec<u8> {
    let mut data = jpeg[..2].to_vec();
    data.extend_from_slice(&[0xFF, 0xEE, 0x00, 0x0E]);
    data.extend_from_slice(b"Adobe");
    data.extend_from_slice(&[0x00, 0x64, 0x00, 0x00, 0x00, 0x00, 0x00]);
    data.extend_from_slice(&jpeg[2..]);
    data
  }

  fn first_image(data: &[u8]) -> lopdf::Dictionary {
    let doc = load(data).unwrap();
    let page_id = *doc.get_pages().get(&1).unwrap();
    let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
    let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
    let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
    let image_id = xobjects.get(b"Im0").unwrap().as_reference().unwrap();
    let image = doc.get_object(image_id).unwrap().as_stream().unwrap();
    image.dict.clone()
  }

  #[test]
  fn adobe_cmyk_is_inverted() {
    let jpeg = with_adobe_segment(gen_jpeg(30, 30, 4, None));
    let info = JpegInfo::parse(&jpeg).unwrap();
    assert!(info.adobe);
    assert_eq!(info.color_space(), "DeviceCMYK");
    let image = first_image(
      &jpegs_to_pdf(vec![(String::from("cmyk.jpg"), jpeg)]).unwrap(),
    );
    assert_eq!(image.get(b"ColorSpace").unwrap().as_name().unwrap(), b"DeviceCMYK");
    let decode = image
      .get(b"Decode")
      .unwrap()
      .as_array()
      .unwrap()
      .iter()
      .map(|value| value.as_i64().unwrap())
      .collect::<Vec<i64>>();
    assert_eq!(decode, vec![1, 0, 1, 0, 1, 0, 1, 0]);

    let plain = gen_jpeg(30, 30, 4, None);
    let image = first_image(
      &jpegs_to_pdf(vec![(String::from("plain.jpg"), plain)]).unwrap(),
    );
    assert!(!image.has(b"Decode"));
  }

  #[test]
  fn invalid_image_is_named() {
    let err = jpegs_to_pdf(vec![(String::from("broken.jpg"), vec![1, 2, 3])])
      .unwrap_err();
    assert_eq!(format!("{}", err), "Invalid image: broken.jpg");
  }
}
