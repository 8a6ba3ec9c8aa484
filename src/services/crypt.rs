//! Pdf standard security handler, revisions 2 and 3 (RC4)
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, StringFormat};
use md5::{Digest, Md5};

use super::pdf::{is_encrypted, load, load_plain, save, PdfError};

const PASSWORD_PADDING: [u8; 32] = [
  0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF,
  0xFA, 0x01, 0x08, 0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C,
  0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

/// Every permission granted, the two low bits must be zero
const ALL_PERMISSIONS: i32 = -4;

/// Rc4 stream cipher, encryption and decryption are the same operation
pub fn rc4(key: &[u8], data: &[u8]) -> Vec<u8> {
  let mut state: [u8; 256] = [0; 256];
  for (i, value) in state.iter_mut().enumerate() {
    *value = i as u8;
  }
  let mut j: u8 = 0;
  for i in 0..256 {
    j = j
      .wrapping_add(state[i])
      .wrapping_add(key[i % key.len()]);
    state.swap(i, j as usize);
  }
  let (mut i, mut j) = (0u8, 0u8);
  data
    .iter()
    .map(|byte| {
      i = i.wrapping_add(1);
      j = j.wrapping_add(state[i as usize]);
      state.swap(i as usize, j as usize);
      let k = state[state[i as usize].wrapping_add(state[j as usize]) as usize];
      byte ^ k
    })
    .collect()
}

fn md5(parts: &[&[u8]]) -> [u8; 16] {
  let mut hasher = Md5::new();
  for part in parts {
    hasher.update(part);
  }
  let mut digest = [0u8; 16];
  digest.copy_from_slice(&hasher.finalize());
  digest
}

fn pad_password(password: &[u8]) -> [u8; 32] {
  let mut padded = PASSWORD_PADDING;
  let len = password.len().min(32);
  padded[..len].copy_from_slice(&password[..len]);
  padded[len..].copy_from_slice(&PASSWORD_PADDING[..32 - len]);
  padded
}

fn xor_key(key: &[u8], value: u8) -> Vec<u8> {
  key.iter().map(|byte| byte ^ value).collect()
}

/// Parameters of a standard security handler
#[derive(Debug, Clone)]
struct SecurityHandler {
  revision: i64,
  key_length: usize,
  owner: Vec<u8>,
  user: Vec<u8>,
  permissions: i32,
  file_id: Vec<u8>,
}

impl SecurityHandler {
  fn from_dict(dict: &Dictionary, file_id: Vec<u8>) -> Result<Self, PdfError> {
    let filter = dict
      .get(b"Filter")
      .and_then(Object::as_name)
      .unwrap_or(b"");
    if filter != b"Standard" {
      return Err(PdfError::UnsupportedEncryption(format!(
        "filter {}",
        String::from_utf8_lossy(filter)
      )));
    }
    let version = dict.get(b"V").and_then(Object::as_i64).unwrap_or(0);
    let revision = dict.get(b"R").and_then(Object::as_i64).unwrap_or(0);
    if !(1..=2).contains(&version) || !(2..=3).contains(&revision) {
      return Err(PdfError::UnsupportedEncryption(format!(
        "V{} R{}",
        version, revision
      )));
    }
    let key_bits = if version == 1 {
      40
    } else {
      dict.get(b"Length").and_then(Object::as_i64).unwrap_or(40)
    };
    if !(40..=128).contains(&key_bits) || key_bits % 8 != 0 {
      return Err(PdfError::UnsupportedEncryption(format!(
        "key length {}",
        key_bits
      )));
    }
    let owner = dict.get(b"O").and_then(Object::as_str)?.to_vec();
    let user = dict.get(b"U").and_then(Object::as_str)?.to_vec();
    if owner.len() < 32 || user.len() < 32 {
      return Err(PdfError::UnsupportedEncryption(String::from(
        "malformed O or U entry",
      )));
    }
    let permissions = dict.get(b"P").and_then(Object::as_i64)? as i32;
    Ok(SecurityHandler {
      revision,
      key_length: (key_bits / 8) as usize,
      owner: owner[..32].to_vec(),
      user: user[..32].to_vec(),
      permissions,
      file_id,
    })
  }

  /// Rc4 key derived from the owner password
  fn owner_key(&self, owner_password: &[u8]) -> Vec<u8> {
    let mut hash = md5(&[&pad_password(owner_password)[..]]);
    if self.revision >= 3 {
      for _ in 0..50 {
        hash = md5(&[&hash[..]]);
      }
    }
    hash[..self.key_length].to_vec()
  }

  fn compute_owner_entry(
    &self,
    owner_password: &[u8],
    user_password: &[u8],
  ) -> Vec<u8> {
    let key = self.owner_key(owner_password);
    let mut value = rc4(&key, &pad_password(user_password));
    if self.revision >= 3 {
      for round in 1..=19u8 {
        value = rc4(&xor_key(&key, round), &value);
      }
    }
    value
  }

  /// File encryption key from the user password
  fn file_key(&self, user_password: &[u8]) -> Vec<u8> {
    let permissions = (self.permissions as u32).to_le_bytes();
    let mut hash = md5(&[
      &pad_password(user_password)[..],
      &self.owner[..],
      &permissions[..],
      &self.file_id[..],
    ]);
    if self.revision >= 3 {
      for _ in 0..50 {
        hash = md5(&[&hash[..self.key_length]]);
      }
    }
    hash[..self.key_length].to_vec()
  }

  fn compute_user_entry(&self, key: &[u8]) -> Vec<u8> {
    if self.revision == 2 {
      return rc4(key, &PASSWORD_PADDING);
    }
    let hash = md5(&[&PASSWORD_PADDING[..], &self.file_id[..]]);
    let mut value = rc4(key, &hash);
    for round in 1..=19u8 {
      value = rc4(&xor_key(key, round), &value);
    }
    value.extend_from_slice(&[0u8; 16]);
    value
  }

  fn authenticate_user(&self, user_password: &[u8]) -> Option<Vec<u8>> {
    let key = self.file_key(user_password);
    let expected = self.compute_user_entry(&key);
    let len = if self.revision == 2 { 32 } else { 16 };
    if expected[..len] == self.user[..len] {
      Some(key)
    } else {
      None
    }
  }

  fn authenticate_owner(&self, owner_password: &[u8]) -> Option<Vec<u8>> {
    let key = self.owner_key(owner_password);
    let mut user_password = self.owner.clone();
    if self.revision == 2 {
      user_password = rc4(&key, &user_password);
    } else {
      for round in (0..=19u8).rev() {
        user_password = rc4(&xor_key(&key, round), &user_password);
      }
    }
    self.authenticate_user(&user_password)
  }

  /// # Authenticate
  /// Try the password as user password then as owner password
  ///
  /// # Return
  /// The file encryption key when the password matches
  fn authenticate(&self, password: &[u8]) -> Option<Vec<u8>> {
    self
      .authenticate_user(password)
      .or_else(|| self.authenticate_owner(password))
  }
}

/// Per object key derived from the file key
fn object_key(file_key: &[u8], id: ObjectId) -> Vec<u8> {
  let number = id.0.to_le_bytes();
  let generation = id.1.to_le_bytes();
  let hash = md5(&[file_key, &number[..3], &generation[..2]]);
  hash[..(file_key.len() + 5).min(16)].to_vec()
}

fn crypt_object(key: &[u8], object: &mut Object) {
  match object {
    Object::String(content, _) => {
      *content = rc4(key, content);
    }
    Object::Array(items) => {
      items.iter_mut().for_each(|item| crypt_object(key, item));
    }
    Object::Dictionary(dict) => {
      dict.iter_mut().for_each(|(_, item)| crypt_object(key, item));
    }
    Object::Stream(stream) => {
      stream
        .dict
        .iter_mut()
        .for_each(|(_, item)| crypt_object(key, item));
      stream.content = rc4(key, &stream.content);
    }
    _ => {}
  }
}

/// Apply rc4 on every string and stream except the encryption dictionary
fn crypt_document(
  doc: &mut Document,
  file_key: &[u8],
  skip: Option<ObjectId>,
) {
  for (id, object) in doc.objects.iter_mut() {
    if Some(*id) == skip {
      continue;
    }
    // Cross reference streams are never encrypted
    if let Object::Stream(stream) = object {
      if stream.dict.get(b"Type").and_then(Object::as_name).ok() == Some(&b"XRef"[..])
      {
        continue;
      }
    }
    crypt_object(&object_key(file_key, *id), object);
  }
}

fn document_id(doc: &Document) -> Option<Vec<u8>> {
  doc
    .trailer
    .get(b"ID")
    .and_then(Object::as_array)
    .ok()
    .and_then(|ids| ids.first())
    .and_then(|id| id.as_str().ok())
    .map(|id| id.to_vec())
}

/// # Encrypt a document
/// Protect a document with rc4 128 bits (revision 3).
/// A file identifier is generated when the document has none.
pub fn encrypt(
  doc: &mut Document,
  user_password: &str,
  owner_password: &str,
) -> Result<(), PdfError> {
  if is_encrypted(doc) {
    return Err(PdfError::Encrypted);
  }
  doc.prune_objects();
  let file_id = match document_id(doc) {
    Some(file_id) => file_id,
    None => {
      let file_id = uuid::Uuid::new_v4().as_bytes().to_vec();
      doc.trailer.set(
        "ID",
        vec![
          Object::String(file_id.clone(), StringFormat::Hexadecimal),
          Object::String(file_id.clone(), StringFormat::Hexadecimal),
        ],
      );
      file_id
    }
  };
  let mut handler = SecurityHandler {
    revision: 3,
    key_length: 16,
    owner: Vec::new(),
    user: Vec::new(),
    permissions: ALL_PERMISSIONS,
    file_id,
  };
  handler.owner = handler
    .compute_owner_entry(owner_password.as_bytes(), user_password.as_bytes());
  let file_key = handler.file_key(user_password.as_bytes());
  handler.user = handler.compute_user_entry(&file_key);
  crypt_document(doc, &file_key, None);
  let encrypt_id = doc.add_object(dictionary! {
    "Filter" => "Standard",
    "V" => 2,
    "R" => 3,
    "Length" => 128,
    "P" => i64::from(ALL_PERMISSIONS),
    "O" => Object::String(handler.owner, StringFormat::Hexadecimal),
    "U" => Object::String(handler.user, StringFormat::Hexadecimal),
  });
  doc.trailer.set("Encrypt", encrypt_id);
  Ok(())
}

/// # Decrypt a document
/// Authenticate `password` as user or owner password then remove
/// the encryption from the document
pub fn decrypt(doc: &mut Document, password: &str) -> Result<(), PdfError> {
  let (encrypt_id, encrypt_dict) = match doc.trailer.get(b"Encrypt") {
    Err(_) => return Ok(()),
    Ok(Object::Reference(id)) => {
      (Some(*id), doc.get_object(*id)?.as_dict()?.clone())
    }
    Ok(object) => (None, object.as_dict()?.clone()),
  };
  let file_id = document_id(doc).unwrap_or_default();
  let handler = SecurityHandler::from_dict(&encrypt_dict, file_id)?;
  let file_key = handler
    .authenticate(password.as_bytes())
    .ok_or(PdfError::WrongPassword)?;
  crypt_document(doc, &file_key, encrypt_id);
  doc.trailer.remove(b"Encrypt");
  if let Some(encrypt_id) = encrypt_id {
    doc.objects.remove(&encrypt_id);
  }
  Ok(())
}

/// Protect pdf bytes with a password used as user and owner password
pub fn protect(data: &[u8], password: &str) -> Result<Vec<u8>, PdfError> {
  let mut doc = load_plain(data)?;
  encrypt(&mut doc, password, password)?;
  save(&mut doc)
}

/// Remove the password of pdf bytes, plain documents are only re-saved
pub fn unlock(data: &[u8], password: &str) -> Result<Vec<u8>, PdfError> {
  let mut doc = load(data)?;
  decrypt(&mut doc, password)?;
  save(&mut doc)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::utils::tests::gen_pdf;

  fn first_page_content(doc: &Document) -> Vec<u8> {
    let page_id = *doc.get_pages().get(&1).unwrap();
    doc.get_page_content(page_id).unwrap()
  }

  #[test]
  fn rc4_known_vectors() {
    assert_eq!(
      rc4(b"Key", b"Plaintext"),
      vec![0xBB, 0xF3, 0x16, 0xE8, 0xD9, 0x40, 0xAF, 0x0A, 0xD3]
    );
    assert_eq!(rc4(b"Wiki", b"pedia"), vec![0x10, 0x21, 0xBF, 0x04, 0x20]);
    assert_eq!(rc4(b"Key", &rc4(b"Key", b"round")), b"round".to_vec());
  }

  #[test]
  fn padding_truncates_and_fills() {
    assert_eq!(pad_password(b""), PASSWORD_PADDING);
    let padded = pad_password(b"abc");
    assert_eq!(&padded[..3], b"abc");
    assert_eq!(&padded[3..], &PASSWORD_PADDING[..29]);
    let long = [b'x'; 40];
    assert_eq!(pad_password(&long), [b'x'; 32]);
  }

  #[test]
  fn object_key_length() {
    assert_eq!(object_key(&[1; 5], (1, 0)).len(), 10);
    assert_eq!(object_key(&[1; 16], (7, 0)).len(), 16);
  }

  #[test]
  fn protect_then_unlock() {
    let plain = load(&gen_pdf(1, "Secret")).unwrap();
    let expected = first_page_content(&plain);

    let protected = protect(&gen_pdf(1, "Secret"), "hunter2").unwrap();
    let doc = load(&protected).unwrap();
    assert!(is_encrypted(&doc));

    let err = unlock(&protected, "wrong").unwrap_err();
    assert!(matches!(err, PdfError::WrongPassword));

    let unlocked = unlock(&protected, "hunter2").unwrap();
    let doc = load(&unlocked).unwrap();
    assert!(!is_encrypted(&doc));
    assert_eq!(first_page_content(&doc), expected);
  }

  #[test]
  fn owner_password_unlocks() {
    let mut doc = load(&gen_pdf(1, "Owner")).unwrap();
    encrypt(&mut doc, "user", "owner").unwrap();
    let data = save(&mut doc).unwrap();
    assert!(unlock(&data, "owner").is_ok());
    assert!(unlock(&data, "user").is_ok());
    assert!(matches!(unlock(&data, "nobody"), Err(PdfError::WrongPassword)));
  }

  #[test]
  fn protect_twice_is_refused() {
    let protected = protect(&gen_pdf(1, "Twice"), "pw").unwrap();
    assert!(matches!(protect(&protected, "pw"), Err(PdfError::Encrypted)));
  }

  #[test]
  fn unlock_plain_document() {
    let unlocked = unlock(&gen_pdf(2, "Plain"), "any").unwrap();
    assert_eq!(load(&unlocked).unwrap().get_pages().len(), 2);
  }

  #[test]
  fn aes_is_unsupported() {
    let mut doc = load(&gen_pdf(1, "Aes")).unwrap();
    let encrypt_id = doc.add_object(dictionary! {
      "Filter" => "Standard",
      "V" => 4,
      "R" => 4,
      "Length" => 128,
      "P" => -4,
      "O" => Object::String(vec![0; 32], StringFormat::Hexadecimal),
      "U" => Object::String(vec![0; 32], StringFormat::Hexadecimal),
    });
    doc.trailer.set("Encrypt", encrypt_id);
    let err = decrypt(&mut doc, "pw").unwrap_err();
    assert!(matches!(err, PdfError::UnsupportedEncryption(_)));
  }
}
