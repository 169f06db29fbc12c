//! Property-based tests for the compression overlay using proptest.
//!
//! These verify the round-trip and demotion invariants over arbitrary byte
//! sequences, which unit tests with fixed payloads cannot cover.

use std::sync::Arc;

use proptest::prelude::*;

use squeezefs_overlay::{Algorithm, CompressFs, Config};
use squeezefs_vfs::{MemFs, Vfs, VfsFile};

fn any_algorithm() -> impl Strategy<Value = Algorithm> {
    prop_oneof![
        Just(Algorithm::Gzip),
        Just(Algorithm::Zstd),
        Just(Algorithm::Lz4),
        Just(Algorithm::Brotli),
        Just(Algorithm::Snappy),
    ]
}

fn overlay(config: Config) -> (CompressFs, MemFs) {
    let mem = MemFs::new();
    let fs = CompressFs::new(Arc::new(mem.clone()), config).unwrap();
    (fs, mem)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_round_trip(
        algo in any_algorithm(),
        data in prop::collection::vec(any::<u8>(), 0..32_768),
    ) {
        let (fs, _mem) = overlay(Config {
            algorithm: algo,
            level: algo.default_level(),
            ..Config::default()
        });

        let mut f = fs.create("blob.bin").unwrap();
        f.write(&data).unwrap();
        f.close().unwrap();

        prop_assert_eq!(fs.read_file("blob.bin").unwrap(), data);
    }

    #[test]
    fn prop_demotion_preserves_data(
        algo in any_algorithm(),
        data in prop::collection::vec(any::<u8>(), 0..256),
    ) {
        let (fs, mem) = overlay(Config {
            algorithm: algo,
            min_size: 1024,
            ..Config::default()
        });

        let mut f = fs.create("tiny.bin").unwrap();
        f.write(&data).unwrap();
        f.close().unwrap();

        prop_assert_eq!(fs.read_file("tiny.bin").unwrap(), data.clone());
        if !data.is_empty() {
            // Demoted files live under the logical name, verbatim.
            prop_assert_eq!(mem.read_file("tiny.bin").unwrap(), data);
            prop_assert!(
                mem.stat(&format!("tiny.bin{}", algo.suffix())).is_err(),
                "demoted file should not exist under the compressed suffix name"
            );
        }
    }

    #[test]
    fn prop_rule_level_is_honored(level in 0i32..=9) {
        let (fs, _mem) = overlay(Config {
            algorithm_rules: vec![squeezefs_overlay::AlgorithmRule::new(
                r"\.dat$",
                Algorithm::Gzip,
                level,
            )],
            ..Config::default()
        });

        let payload = vec![0xabu8; 4096];
        let mut f = fs.create("x.dat").unwrap();
        f.write(&payload).unwrap();
        f.close().unwrap();

        prop_assert_eq!(fs.read_file("x.dat").unwrap(), payload);
    }

    #[test]
    fn prop_counters_monotone(writes in prop::collection::vec(
        prop::collection::vec(any::<u8>(), 0..2048), 1..8,
    )) {
        let (fs, _mem) = overlay(Config::default());
        let mut last = fs.stats();
        for (i, data) in writes.iter().enumerate() {
            let name = format!("f{i}.bin");
            let mut f = fs.create(&name).unwrap();
            f.write(data).unwrap();
            f.close().unwrap();
            let _ = fs.read_file(&name).unwrap();

            let now = fs.stats();
            prop_assert!(now.files_compressed >= last.files_compressed);
            prop_assert!(now.files_decompressed >= last.files_decompressed);
            prop_assert!(now.files_skipped >= last.files_skipped);
            prop_assert!(now.bytes_read >= last.bytes_read);
            prop_assert!(now.bytes_written >= last.bytes_written);
            prop_assert!(now.bytes_compressed >= last.bytes_compressed);
            prop_assert!(now.bytes_decompressed >= last.bytes_decompressed);
            last = now;
        }
    }
}
