//! Randomized end-to-end check: tokens captured at arbitrary points
//! during writing must seek back to the right bytes, in any order,
//! under either segmentation policy.

use std::io::prelude::*;
use std::io::Cursor;

use anyhow::Result;
use flate2::Compression;
use rand::prelude::*;
use rand::rngs::StdRng;

use multigz::*;

/// Streams `data` into `writer` in randomly sized bursts, capturing a
/// token (and the decompressed index it stands for) at each cut point.
fn write_with_tokens<W: SegmentedWrite>(
    writer: &mut W,
    data: &[u8],
    rng: &mut StdRng,
) -> Result<Vec<(Offset, usize)>> {
    let mut cuts: Vec<usize> = (0..10)
        .map(|_| rng.gen_range(0..data.len() - 64))
        .collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut tokens = Vec::new();
    let mut pos = 0;
    for &cut in &cuts {
        writer.write_all(&data[pos..cut])?;
        tokens.push((writer.offset(), cut));
        pos = cut;
    }
    writer.write_all(&data[pos..])?;
    writer.close()?;
    Ok(tokens)
}

fn seek_all(file: Vec<u8>, data: &[u8], tokens: &mut Vec<(Offset, usize)>, rng: &mut StdRng) -> Result<()> {
    let mut reader = Reader::new(Cursor::new(file))?;
    tokens.shuffle(rng);
    for &(token, at) in tokens.iter() {
        reader.seek(token)?;
        let mut check = [0u8; 64];
        reader.read_exact(&mut check)?;
        assert_eq!(check[..], data[at..at + 64], "token {:?} at {}", token, at);
    }
    Ok(())
}

#[test]
fn random_tokens_survive_random_seeks() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    for seed in 0..100 {
        let mut rng = StdRng::seed_from_u64(seed);
        let len = rng.gen_range(10_000..150_000);
        let data: Vec<u8> = (0..len).map(|_| rng.gen()).collect();

        let mut file = Vec::new();
        let mut writer = BlockWriter::new(&mut file, Compression::fast(), 1024)?;
        let mut tokens = write_with_tokens(&mut writer, &data, &mut rng)?;
        drop(writer);
        seek_all(file, &data, &mut tokens, &mut rng)?;

        let mut file = Vec::new();
        let mut writer = RsyncableWriter::new(&mut file, Compression::fast());
        let mut tokens = write_with_tokens(&mut writer, &data, &mut rng)?;
        drop(writer);
        seek_all(file, &data, &mut tokens, &mut rng)?;
    }
    Ok(())
}
