//! Persisted artifact formats and file I/O.
//!
//! Ceremony artifacts (SRS, proving keys) are compressed binary with a
//! one-byte phase tag, so a finalized artifact presented for further
//! contribution is detected as `PhaseAlreadyFinalized` rather than silently
//! accepted. The verification key and proof record are human-inspectable
//! JSON: group elements as hex of their compressed encodings, field elements
//! as decimal strings.
//!
//! Every write is atomic: serialize fully to a `.tmp` sibling, then rename.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use ark_bn254::{Bn254, Fr, G1Affine, G2Affine};
use ark_ff::PrimeField;
use ark_groth16::{Proof, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::ceremony::{CircuitKeys, Phase1Srs, Phase2Setup, PreparedSrs};
use crate::errors::{Result, ZkSquareError};
use crate::witness::PublicSignals;

/// Artifact locations, relative to the working directory: ceremony outputs
/// under `keys/`, proofs under `build/`.
pub mod artifact_paths {
    use std::path::PathBuf;

    const KEYS_DIR: &str = "keys";
    const BUILD_DIR: &str = "build";

    pub fn pot(power: u32, index: u32) -> PathBuf {
        PathBuf::from(KEYS_DIR).join(format!("pot{power}_{index:04}.srs"))
    }

    pub fn pot_final(power: u32) -> PathBuf {
        PathBuf::from(KEYS_DIR).join(format!("pot{power}_final.srs"))
    }

    pub fn zkey(index: u32) -> PathBuf {
        PathBuf::from(KEYS_DIR).join(format!("square_{index:04}.zkey"))
    }

    pub fn zkey_final() -> PathBuf {
        PathBuf::from(KEYS_DIR).join("square_final.zkey")
    }

    pub fn verification_key() -> PathBuf {
        PathBuf::from(KEYS_DIR).join("verification_key.json")
    }

    pub fn proof() -> PathBuf {
        PathBuf::from(BUILD_DIR).join("proof.json")
    }
}

const TAG_PHASE1_OPEN: u8 = 1;
const TAG_PHASE1_PREPARED: u8 = 2;
const TAG_PHASE2_OPEN: u8 = 3;
const TAG_KEYS_FINAL: u8 = 4;

/// Writes fully, then renames into place. A failed write never leaves a
/// partial artifact at the destination.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file_name = path
        .file_name()
        .ok_or_else(|| ZkSquareError::MalformedInput(format!("not a file path: {}", path.display())))?;
    let tmp = path.with_file_name(format!("{}.tmp", file_name.to_string_lossy()));
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ZkSquareError::ArtifactNotFound(path.to_path_buf())
        } else {
            e.into()
        }
    })
}

fn write_tagged<T: CanonicalSerialize>(path: &Path, tag: u8, artifact: &T) -> Result<()> {
    let mut buf = vec![tag];
    artifact.serialize_compressed(&mut buf)?;
    atomic_write(path, &buf)
}

fn read_tagged(path: &Path) -> Result<(u8, Vec<u8>)> {
    let bytes = read_bytes(path)?;
    match bytes.split_first() {
        Some((tag, body)) => Ok((*tag, body.to_vec())),
        None => Err(ZkSquareError::MalformedInput(format!(
            "empty artifact: {}",
            path.display()
        ))),
    }
}

fn decode_body<T: CanonicalDeserialize>(path: &Path, body: &[u8]) -> Result<T> {
    T::deserialize_compressed(body).map_err(|e| {
        ZkSquareError::MalformedInput(format!("corrupt artifact {}: {e}", path.display()))
    })
}

pub fn write_phase1_srs(path: &Path, srs: &Phase1Srs) -> Result<()> {
    write_tagged(path, TAG_PHASE1_OPEN, srs)
}

/// Loads an SRS for further contribution. A prepared SRS at this path is a
/// trust-boundary violation, not a fallback.
pub fn read_phase1_srs(path: &Path) -> Result<Phase1Srs> {
    match read_tagged(path)? {
        (TAG_PHASE1_OPEN, body) => decode_body(path, &body),
        (TAG_PHASE1_PREPARED, _) => Err(ZkSquareError::PhaseAlreadyFinalized("phase 1")),
        (tag, _) => Err(ZkSquareError::MalformedInput(format!(
            "unexpected artifact tag {tag} in {}",
            path.display()
        ))),
    }
}

pub fn write_prepared_srs(path: &Path, srs: &PreparedSrs) -> Result<()> {
    write_tagged(path, TAG_PHASE1_PREPARED, srs)
}

pub fn read_prepared_srs(path: &Path) -> Result<PreparedSrs> {
    match read_tagged(path)? {
        (TAG_PHASE1_PREPARED, body) => decode_body(path, &body),
        (TAG_PHASE1_OPEN, _) => Err(ZkSquareError::MalformedInput(format!(
            "SRS at {} has not been prepared for phase 2",
            path.display()
        ))),
        (tag, _) => Err(ZkSquareError::MalformedInput(format!(
            "unexpected artifact tag {tag} in {}",
            path.display()
        ))),
    }
}

pub fn write_phase2_setup(path: &Path, setup: &Phase2Setup) -> Result<()> {
    write_tagged(path, TAG_PHASE2_OPEN, setup)
}

pub fn read_phase2_setup(path: &Path) -> Result<Phase2Setup> {
    match read_tagged(path)? {
        (TAG_PHASE2_OPEN, body) => decode_body(path, &body),
        (TAG_KEYS_FINAL, _) => Err(ZkSquareError::PhaseAlreadyFinalized("phase 2")),
        (tag, _) => Err(ZkSquareError::MalformedInput(format!(
            "unexpected artifact tag {tag} in {}",
            path.display()
        ))),
    }
}

pub fn write_circuit_keys(path: &Path, keys: &CircuitKeys) -> Result<()> {
    write_tagged(path, TAG_KEYS_FINAL, keys)
}

pub fn read_circuit_keys(path: &Path) -> Result<CircuitKeys> {
    match read_tagged(path)? {
        (TAG_KEYS_FINAL, body) => decode_body(path, &body),
        (TAG_PHASE2_OPEN, _) => Err(ZkSquareError::MalformedInput(format!(
            "proving key at {} has not been finalized",
            path.display()
        ))),
        (tag, _) => Err(ZkSquareError::MalformedInput(format!(
            "unexpected artifact tag {tag} in {}",
            path.display()
        ))),
    }
}

fn encode_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

fn decode_hex(s: &str) -> Result<Vec<u8>> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.len() % 2 != 0 {
        return Err(ZkSquareError::MalformedInput(format!(
            "odd-length hex string: {s}"
        )));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| ZkSquareError::MalformedInput(format!("invalid hex string: {s}")))
        })
        .collect()
}

fn encode_point<T: CanonicalSerialize>(point: &T) -> Result<String> {
    let mut buf = Vec::new();
    point.serialize_compressed(&mut buf)?;
    Ok(encode_hex(&buf))
}

fn decode_point<T: CanonicalDeserialize>(s: &str) -> Result<T> {
    let bytes = decode_hex(s)?;
    T::deserialize_compressed(&bytes[..])
        .map_err(|e| ZkSquareError::MalformedInput(format!("invalid group element {s}: {e}")))
}

fn encode_field(value: &Fr) -> String {
    value.into_bigint().to_string()
}

fn decode_field(s: &str) -> Result<Fr> {
    let value = BigUint::from_str(s)
        .map_err(|_| ZkSquareError::MalformedInput(format!("invalid field element: {s}")))?;
    let modulus: BigUint = Fr::MODULUS.into();
    if value >= modulus {
        return Err(ZkSquareError::MalformedInput(format!(
            "field element out of range: {s}"
        )));
    }
    Ok(Fr::from(value))
}

/// The exported verification key: small, public, shareable.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerificationKeyFile {
    pub protocol: String,
    pub curve: String,
    pub n_public: usize,
    pub alpha_g1: String,
    pub beta_g2: String,
    pub gamma_g2: String,
    pub delta_g2: String,
    pub ic: Vec<String>,
}

impl VerificationKeyFile {
    pub fn from_vk(vk: &VerifyingKey<Bn254>) -> Result<Self> {
        Ok(Self {
            protocol: "groth16".to_string(),
            curve: "bn254".to_string(),
            n_public: vk.gamma_abc_g1.len().saturating_sub(1),
            alpha_g1: encode_point(&vk.alpha_g1)?,
            beta_g2: encode_point(&vk.beta_g2)?,
            gamma_g2: encode_point(&vk.gamma_g2)?,
            delta_g2: encode_point(&vk.delta_g2)?,
            ic: vk
                .gamma_abc_g1
                .iter()
                .map(encode_point)
                .collect::<Result<_>>()?,
        })
    }

    pub fn to_vk(&self) -> Result<VerifyingKey<Bn254>> {
        if self.protocol != "groth16" || self.curve != "bn254" {
            return Err(ZkSquareError::MalformedInput(format!(
                "unsupported verification key: protocol {}, curve {}",
                self.protocol, self.curve
            )));
        }
        if self.ic.len() != self.n_public + 1 {
            return Err(ZkSquareError::MalformedInput(format!(
                "verification key declares {} public inputs but carries {} IC elements",
                self.n_public,
                self.ic.len()
            )));
        }
        Ok(VerifyingKey {
            alpha_g1: decode_point::<G1Affine>(&self.alpha_g1)?,
            beta_g2: decode_point::<G2Affine>(&self.beta_g2)?,
            gamma_g2: decode_point::<G2Affine>(&self.gamma_g2)?,
            delta_g2: decode_point::<G2Affine>(&self.delta_g2)?,
            gamma_abc_g1: self
                .ic
                .iter()
                .map(|s| decode_point::<G1Affine>(s))
                .collect::<Result<_>>()?,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        atomic_write(path, &serde_json::to_vec_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = read_bytes(path)?;
        serde_json::from_slice(&bytes).map_err(|e| {
            ZkSquareError::MalformedInput(format!("corrupt verification key {}: {e}", path.display()))
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProofJson {
    pub pi_a: String,
    pub pi_b: String,
    pub pi_c: String,
}

/// Diagnostic echo of the human-readable inputs. Never read by verification;
/// sharing it discloses the secret, which is fine for a demo record kept by
/// the prover.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginalInputs {
    pub secret_number: i64,
    pub public_square: i64,
}

/// The persisted proof artifact: proof, ordered public signals, and the
/// diagnostic input echo.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProofRecord {
    pub proof: ProofJson,
    #[serde(rename = "publicSignals")]
    pub public_signals: Vec<String>,
    pub input: OriginalInputs,
}

impl ProofRecord {
    pub fn new(
        proof: &Proof<Bn254>,
        signals: &PublicSignals,
        input: OriginalInputs,
    ) -> Result<Self> {
        Ok(Self {
            proof: ProofJson {
                pi_a: encode_point(&proof.a)?,
                pi_b: encode_point(&proof.b)?,
                pi_c: encode_point(&proof.c)?,
            },
            public_signals: signals.0.iter().map(encode_field).collect(),
            input,
        })
    }

    pub fn proof(&self) -> Result<Proof<Bn254>> {
        Ok(Proof {
            a: decode_point(&self.proof.pi_a)?,
            b: decode_point(&self.proof.pi_b)?,
            c: decode_point(&self.proof.pi_c)?,
        })
    }

    pub fn signals(&self) -> Result<PublicSignals> {
        Ok(PublicSignals(
            self.public_signals
                .iter()
                .map(|s| decode_field(s))
                .collect::<Result<_>>()?,
        ))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        atomic_write(path, &serde_json::to_vec_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = read_bytes(path)?;
        serde_json::from_slice(&bytes).map_err(|e| {
            ZkSquareError::MalformedInput(format!("corrupt proof record {}: {e}", path.display()))
        })
    }
}
