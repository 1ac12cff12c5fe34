//! Demo CLI: mounts a file-backed device, appends some records, and
//! replays one file back. The hosting shell for the library, kept thin
//! and outside `fkfs` itself (SPEC_FULL.md §2), mirroring the original
//! firmware's `examples/simple/main.cpp` but as a single-threaded,
//! synchronous command-line program instead of an Arduino sketch.

use std::path::Path;

use fkfs::{FileBlockDevice, Filesystem, IteratorConfig, StdRandom, SystemClock};
use log::{error, info};

const FILE_LOG: u8 = 0;
const FILE_DATA: u8 = 1;
const PRIORITY_LOWEST: u8 = 255;
const PRIORITY_HIGHEST: u8 = 0;

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "fkfs.img".to_string());
    let path = Path::new(&path);

    if let Err(err) = run(path) {
        error!("fkfs-cli: {err}");
        std::process::exit(1);
    }
}

fn run(path: &Path) -> fkfs::FkfsResult<()> {
    let dev = if path.exists() {
        FileBlockDevice::open(path)?
    } else {
        FileBlockDevice::create(path, 128)?
    };

    let mut fs = Filesystem::create(dev, SystemClock::new(), StdRandom::new()).with_first_block(4);

    fs.initialize_file(FILE_LOG, PRIORITY_LOWEST, false, "DEBUG.LOG")?;
    fs.initialize_file(FILE_DATA, PRIORITY_HIGHEST, true, "DATA.BIN")?;
    fs.initialize(false)?;
    fs.log_statistics();

    for i in 0..20 {
        if i % 3 == 0 {
            fs.append(FILE_DATA, b"DATA-sample-record")?;
        } else {
            fs.append(FILE_LOG, format!("hello, world {i}").as_bytes())?;
        }
    }
    fs.flush()?;

    let mut iter = fs.iterator_create(FILE_LOG)?;
    let config = IteratorConfig::default();
    while fs.iterate(&mut iter, &config)? {
        let token = iter.token();
        info!(
            "fkfs: iter: block={} offset={} data={:?}",
            token.block,
            token.offset,
            String::from_utf8_lossy(iter.data())
        );
    }

    let stats = fs.statistics();
    info!(
        "fkfs: reads={} writes={} iterate_calls={}",
        stats.block_reads, stats.block_writes, stats.iterate_calls
    );

    Ok(())
}
