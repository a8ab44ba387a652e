//! File-based round trip, exercising the scheduler the way the `bcc` binary
//! actually uses it: real files rather than in-memory buffers.

use std::fs::File;
use std::io::{Read, Write};

use bcc::context::{keys, Context};
use bcc::event::ListenerSet;
use bcc::scheduler::{Config, Scheduler};

#[test]
fn compress_and_decompress_through_real_files() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("input.txt");
    let compressed_path = dir.path().join("input.bcc");
    let output_path = dir.path().join("output.txt");

    let data = b"a repeated sentence for a repeated sentence test.\n".repeat(200);
    File::create(&input_path).unwrap().write_all(&data).unwrap();

    let mut ctx = Context::new();
    ctx.set(keys::CODEC, "RANGE");
    ctx.set(keys::TRANSFORM, "BWT+ZRLT");
    ctx.set(keys::BLOCK_SIZE, "4096");
    ctx.set(keys::CHECKSUM, "TRUE");
    let config = Config::from_context(&ctx).unwrap();
    let scheduler = Scheduler::new(config, ListenerSet::new());

    scheduler
        .encode(File::open(&input_path).unwrap(), File::create(&compressed_path).unwrap())
        .unwrap();

    let decode_config = Config::from_context(&Context::new()).unwrap();
    Scheduler::new(decode_config, ListenerSet::new())
        .decode(File::open(&compressed_path).unwrap(), File::create(&output_path).unwrap())
        .unwrap();

    let mut restored = Vec::new();
    File::open(&output_path).unwrap().read_to_end(&mut restored).unwrap();
    assert_eq!(restored, data);

    let compressed_len = std::fs::metadata(&compressed_path).unwrap().len();
    assert!((compressed_len as usize) < data.len());
}
