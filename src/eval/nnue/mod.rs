use anyhow::{anyhow, bail, Context, Result};
use cozy_chess::Board;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::search::eval::Evaluator;

pub mod features;

pub use features::FeatureSet;

const MAGIC: &[u8; 8] = b"PIENNUE1";

/// Largest weight count accepted from a header (1 GiB of f32s).
const MAX_WEIGHTS: usize = 1 << 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkMeta {
    pub version: u32,
    pub input_dim: usize,
    pub hidden_dim: usize,
    pub output_dim: usize,
}

/// Dense one-hidden-layer network with a ReLU hidden layer and a linear
/// output, scored from White's point of view.
#[derive(Debug, Clone)]
pub struct Network {
    pub meta: NetworkMeta,
    w1: Vec<f32>, // hidden_dim x input_dim
    b1: Vec<f32>, // hidden_dim
    w2: Vec<f32>, // output_dim x hidden_dim
    b2: Vec<f32>, // output_dim
    output_scale: f32,
}

fn read_u32<R: Read>(r: &mut R, what: &str) -> Result<u32> {
    let mut buf4 = [0u8; 4];
    r.read_exact(&mut buf4).with_context(|| format!("read {what}"))?;
    Ok(u32::from_le_bytes(buf4))
}

// Weight counts of the two layers, or an error for dims no real file has.
fn layer_sizes(n: usize, h: usize, o: usize) -> Result<(usize, usize)> {
    if n == 0 || h == 0 || o == 0 {
        bail!("network dims {n}x{h}x{o} must all be non-zero");
    }
    let sizes = h.checked_mul(n).zip(o.checked_mul(h));
    match sizes {
        Some((w1, w2)) if w1 <= MAX_WEIGHTS && w2 <= MAX_WEIGHTS => Ok((w1, w2)),
        _ => bail!("network dims {n}x{h}x{o} are too large"),
    }
}

fn read_f32s<R: Read>(r: &mut R, n: usize, what: &str) -> Result<Vec<f32>> {
    let mut buf = vec![0u8; n * 4];
    r.read_exact(&mut buf).with_context(|| format!("read {n} f32s for {what} (file truncated?)"))?;
    Ok(buf.chunks_exact(4).map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])).collect())
}

impl Network {
    /// Builds a network from raw layers, checking every layer size against
    /// the declared dimensions.
    pub fn from_parts(meta: NetworkMeta, w1: Vec<f32>, b1: Vec<f32>, w2: Vec<f32>, b2: Vec<f32>) -> Result<Self> {
        let (n, h, o) = (meta.input_dim, meta.hidden_dim, meta.output_dim);
        let (w1_len, w2_len) = layer_sizes(n, h, o)?;
        if w1.len() != w1_len || b1.len() != h || w2.len() != w2_len || b2.len() != o {
            bail!("layer sizes do not match dims {n}x{h}x{o}");
        }
        Ok(Self { meta, w1, b1, w2, b2, output_scale: 1.0 })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_progress(path, |_| {})
    }

    /// Loads a `PIENNUE1` file, reporting progress in percent as the weights
    /// are read.
    pub fn load_with_progress<P: AsRef<Path>, F: FnMut(u8)>(path: P, progress: F) -> Result<Self> {
        let f = File::open(&path).with_context(|| format!("open nnue file: {}", path.as_ref().display()))?;
        Self::from_reader(BufReader::new(f), progress)
    }

    // Format:
    // magic: 8 bytes b"PIENNUE1"
    // u32 version (LE)
    // u32 input_dim, u32 hidden_dim, u32 output_dim (LE)
    // f32 w1[hidden_dim * input_dim]
    // f32 b1[hidden_dim]
    // f32 w2[output_dim * hidden_dim]
    // f32 b2[output_dim]
    pub fn from_reader<R: Read, F: FnMut(u8)>(mut r: R, mut progress: F) -> Result<Self> {
        let mut magic = [0u8; 8];
        r.read_exact(&mut magic).context("read magic")?;
        if &magic != MAGIC {
            bail!("bad NNUE magic");
        }
        let version = read_u32(&mut r, "version")?;
        let input_dim = read_u32(&mut r, "input_dim")? as usize;
        let hidden_dim = read_u32(&mut r, "hidden_dim")? as usize;
        let output_dim = read_u32(&mut r, "output_dim")? as usize;
        let (w1_len, w2_len) = layer_sizes(input_dim, hidden_dim, output_dim)?;
        progress(5);

        let mut w1 = Vec::with_capacity(w1_len);
        for j in 0..hidden_dim {
            w1.extend(read_f32s(&mut r, input_dim, "w1")?);
            progress((5 + 80 * (j + 1) / hidden_dim) as u8);
        }
        let b1 = read_f32s(&mut r, hidden_dim, "b1")?;
        progress(90);
        let w2 = read_f32s(&mut r, w2_len, "w2")?;
        let b2 = read_f32s(&mut r, output_dim, "b2")?;
        progress(100);

        Self::from_parts(NetworkMeta { version, input_dim, hidden_dim, output_dim }, w1, b1, w2, b2)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let f = File::create(&path).with_context(|| format!("create nnue file: {}", path.as_ref().display()))?;
        let mut w = BufWriter::new(f);
        self.write_to(&mut w)?;
        w.flush()?;
        Ok(())
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(MAGIC)?;
        for v in [self.meta.version, self.meta.input_dim as u32, self.meta.hidden_dim as u32, self.meta.output_dim as u32] {
            w.write_all(&v.to_le_bytes())?;
        }
        for layer in [&self.w1, &self.b1, &self.w2, &self.b2] {
            for x in layer.iter() {
                w.write_all(&x.to_le_bytes())?;
            }
        }
        Ok(())
    }

    /// Multiplier from raw network output to centipawns.
    pub fn with_output_scale(mut self, scale: f32) -> Self {
        self.output_scale = scale;
        self
    }

    pub fn output_scale(&self) -> f32 { self.output_scale }

    pub fn feature_set(&self) -> Option<FeatureSet> {
        FeatureSet::for_input_dim(self.meta.input_dim)
    }

    /// Raw first output for an already encoded input.
    pub fn forward(&self, x: &[f32]) -> f32 {
        let n = self.meta.input_dim;
        let h = self.meta.hidden_dim;
        let mut out = self.b2[0];
        for j in 0..h {
            let row = &self.w1[j * n..(j + 1) * n];
            let sum = self.b1[j] + row.iter().zip(x).map(|(w, v)| w * v).sum::<f32>();
            if sum > 0.0 {
                out += self.w2[j] * sum;
            }
        }
        out
    }
}

impl Evaluator for Network {
    fn name(&self) -> &str { "nnue" }

    fn evaluate(&self, board: &Board) -> Result<i32> {
        let features = self
            .feature_set()
            .ok_or_else(|| anyhow!("no feature encoding for input dimension {}", self.meta.input_dim))?;
        let out = self.forward(&features.encode(board)) * self.output_scale;
        if !out.is_finite() {
            bail!("network produced a non-finite score");
        }
        Ok(out.round() as i32)
    }
}
