//! V2C builders and collaborator doubles shared by the unit tests.
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::crypto::{omac_bytes, Aes, ABREAST_DM_HASH_SIZE};
use crate::error::{FitError, FitResult};
use crate::parser::FieldHeader;
use crate::verification::RsaVerifier;

/// RFC 4493 example key.
pub const AES_KEY: [u8; 16] = [
    0x2b, 0x7e, 0x15, 0x16, 0x28, 0xae, 0xd2, 0xa6, 0xab, 0xf7, 0x15, 0x88, 0x09, 0xcf, 0x4f, 0x3c,
];

/// 2048-bit vendor key, as SubjectPublicKeyInfo DER.
pub const RSA_SPKI_DER: &[u8] = include_bytes!("verification/testdata/vendor_spki.der");
/// The same key as SubjectPublicKeyInfo PEM.
pub const RSA_SPKI_PEM: &[u8] = include_bytes!("verification/testdata/vendor_spki.pem");
/// The same key as a PKCS#1 `RSAPublicKey` DER.
pub const RSA_PKCS1_DER: &[u8] = include_bytes!("verification/testdata/vendor_pkcs1.der");
/// PKCS#1 v1.5 signature over the Abreast-DM hash of
/// `TestLicense::default().license_object()`.
pub const RSA_LICENSE_SIG: &[u8] = include_bytes!("verification/testdata/license.sig");

/// One field of an object under construction.
#[derive(Debug, Clone)]
pub enum Node {
    /// Inline integer (at most 0x7FFE).
    Int(u32),
    /// Skip this many schema indexes.
    Skip(u32),
    /// String payload.
    Str(Vec<u8>),
    /// Four-byte integer payload.
    Word(u32),
    /// Payload holding an already-encoded object or array body.
    Raw(Vec<u8>),
}

/// Encode an object: field count, headers, then the data section.
pub fn object(nodes: Vec<Node>) -> Vec<u8> {
    let mut headers = Vec::new();
    let mut data = Vec::new();

    for node in nodes {
        let header = match node {
            Node::Int(v) => FieldHeader::Inline(v),
            Node::Skip(n) => FieldHeader::Skip(n),
            Node::Str(bytes) | Node::Raw(bytes) => {
                data.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
                data.extend_from_slice(&bytes);
                FieldHeader::Payload
            }
            Node::Word(v) => {
                data.extend_from_slice(&4u32.to_le_bytes());
                data.extend_from_slice(&v.to_le_bytes());
                FieldHeader::Payload
            }
        };
        headers.push(header.encode().expect("header out of range"));
    }

    let mut out = Vec::new();
    out.extend_from_slice(&(headers.len() as u16).to_le_bytes());
    for h in headers {
        out.extend_from_slice(&h.to_le_bytes());
    }
    out.extend_from_slice(&data);
    out
}

/// Array body: `{u32 size, object}` per element, without the outer size.
pub fn array(elements: Vec<Vec<u8>>) -> Vec<u8> {
    let mut out = Vec::new();
    for element in elements {
        out.extend_from_slice(&(element.len() as u32).to_le_bytes());
        out.extend_from_slice(&element);
    }
    out
}

#[derive(Debug, Clone)]
pub struct TestPart {
    pub part_id: u32,
    pub features: Vec<u32>,
    pub perpetual: bool,
    pub start_date: Option<u32>,
    pub end_date: Option<u32>,
}

impl TestPart {
    pub fn perpetual(part_id: u32, features: &[u32]) -> Self {
        Self {
            part_id,
            features: features.to_vec(),
            perpetual: true,
            start_date: None,
            end_date: None,
        }
    }

    pub fn window(part_id: u32, features: &[u32], start: Option<u32>, end: u32) -> Self {
        Self {
            part_id,
            features: features.to_vec(),
            perpetual: false,
            start_date: start,
            end_date: Some(end),
        }
    }

    fn encode(&self) -> Vec<u8> {
        let features = self.features.iter().map(|id| object(vec![Node::Int(*id)])).collect();
        let date = |d: Option<u32>| d.map_or(Node::Skip(1), Node::Word);
        let properties = object(vec![
            Node::Raw(array(features)),
            if self.perpetual { Node::Int(1) } else { Node::Skip(1) },
            date(self.start_date),
            date(self.end_date),
        ]);
        object(vec![Node::Int(self.part_id), Node::Raw(properties)])
    }
}

/// Unsigned license content with one vendor and one product.
#[derive(Debug, Clone)]
pub struct TestLicense {
    pub licgen_version: u32,
    pub lm_version: u32,
    pub uid: Vec<u8>,
    pub fingerprint: Option<Vec<u8>>,
    pub container_id: u32,
    pub vendor_id: u32,
    pub product_id: u32,
    pub parts: Vec<TestPart>,
}

impl Default for TestLicense {
    fn default() -> Self {
        Self {
            licgen_version: 100,
            lm_version: 1,
            uid: vec![0x11; 32],
            fingerprint: None,
            container_id: 1,
            vendor_id: 37515,
            product_id: 10,
            parts: vec![TestPart::perpetual(1, &[1])],
        }
    }
}

impl TestLicense {
    /// The LICENSE object: the bytes covered by the signature.
    pub fn license_object(&self) -> Vec<u8> {
        let header = object(vec![
            Node::Int(self.licgen_version),
            Node::Int(self.lm_version),
            Node::Str(self.uid.clone()),
            match &self.fingerprint {
                Some(fp) => Node::Str(fp.clone()),
                None => Node::Skip(1),
            },
        ]);

        let parts = self.parts.iter().map(TestPart::encode).collect();
        let product = object(vec![
            Node::Int(self.product_id),
            Node::Skip(1),
            Node::Raw(array(parts)),
        ]);
        let vendor = object(vec![Node::Word(self.vendor_id), Node::Raw(product)]);
        let container = object(vec![
            Node::Skip(4),
            Node::Int(self.container_id),
            Node::Raw(array(vec![vendor])),
        ]);

        object(vec![Node::Raw(header), Node::Raw(container)])
    }

    /// Full V2C with a single signature block.
    pub fn with_signature(&self, algorithm_id: u32, signature: Vec<u8>) -> Vec<u8> {
        let block = object(vec![Node::Skip(2), Node::Int(algorithm_id), Node::Str(signature)]);
        object(vec![
            Node::Raw(self.license_object()),
            Node::Raw(array(vec![block])),
        ])
    }

    /// V2C signed with AES-128 OMAC.
    pub fn sign_omac(&self, key: &[u8; 16]) -> Vec<u8> {
        let cipher = Aes::new(key).expect("AES-128 key");
        let mac = omac_bytes(&cipher, &self.license_object()).expect("omac");
        self.with_signature(2, mac.to_vec())
    }
}

/// `RsaVerifier` double that records its calls.
#[derive(Clone)]
pub struct CountingRsa {
    accept: bool,
    calls: Rc<Cell<usize>>,
    last: Rc<RefCell<Option<([u8; ABREAST_DM_HASH_SIZE], Vec<u8>)>>>,
}

impl CountingRsa {
    pub fn accepting() -> Self {
        Self::new(true)
    }

    pub fn rejecting() -> Self {
        Self::new(false)
    }

    fn new(accept: bool) -> Self {
        Self {
            accept,
            calls: Rc::new(Cell::new(0)),
            last: Rc::new(RefCell::new(None)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    pub fn last_digest(&self) -> Option<[u8; ABREAST_DM_HASH_SIZE]> {
        self.last.borrow().as_ref().map(|(digest, _)| *digest)
    }

    pub fn last_key(&self) -> Option<Vec<u8>> {
        self.last.borrow().as_ref().map(|(_, key)| key.clone())
    }
}

impl RsaVerifier for CountingRsa {
    fn verify(
        &self,
        public_key: &[u8],
        digest: &[u8; ABREAST_DM_HASH_SIZE],
        _signature: &[u8],
    ) -> FitResult<()> {
        self.calls.set(self.calls.get() + 1);
        *self.last.borrow_mut() = Some((*digest, public_key.to_vec()));
        if self.accept {
            Ok(())
        } else {
            Err(FitError::InvalidSignature)
        }
    }
}
