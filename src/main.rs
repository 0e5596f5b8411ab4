use std::fs;
use std::io::BufReader;

use anyhow::{Result, bail};
use pod5_writer::combined::Footer;
use pod5_writer::{
    CalibrationData, EndReason, EndReasonData, FileWriterOptions, IdGenerator, PoreData,
    RandomIdGenerator, ReadData, RunInfoData, create_combined_file,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

const NUM_READS: usize = 1000;
const NUM_CHANNELS: u16 = 512;

fn synthetic_signal(rng: &mut SmallRng) -> Vec<i16> {
    let len = rng.random_range(2_000..250_000);
    let mut level: i16 = 500;
    (0..len)
        .map(|_| {
            level = (level + rng.random_range(-8..=8)).clamp(100, 1000);
            level
        })
        .collect()
}

fn write_file(opath: &str) -> Result<()> {
    let options = FileWriterOptions::default();
    let mut writer = create_combined_file(opath, "pod5-writer-demo", &options)?;
    let mut ids = RandomIdGenerator::new();
    let mut rng = SmallRng::seed_from_u64(pod5_writer::ID_SEED);

    let calibration = writer.add_calibration(&CalibrationData::new(-243.0, 0.1462))?;
    let end_reason = writer.add_end_reason(&EndReasonData {
        name: EndReason::SignalPositive,
        forced: false,
    })?;
    let run_info = writer.add_run_info(&RunInfoData {
        acquisition_id: ids.next_id().hyphenated().to_string(),
        sample_rate: 5000,
        ..RunInfoData::default()
    })?;

    let mut total_samples = 0;
    for read_number in 0..NUM_READS {
        let channel = rng.random_range(1..=NUM_CHANNELS);
        let pore = writer.add_pore(&PoreData {
            channel,
            well: 1,
            pore_type: "not_set".to_string(),
        })?;
        let signal = synthetic_signal(&mut rng);
        total_samples += signal.len();

        let read = ReadData {
            read_id: ids.next_id(),
            pore,
            calibration,
            read_number: read_number as u32,
            start_sample: total_samples as u64,
            median_before: rng.random_range(180.0..240.0),
            end_reason,
            run_info,
        };
        writer.add_complete_read(&read, &signal)?;
    }
    writer.close()?;

    eprintln!(
        "Wrote {} reads ({} samples, {} signal rows)",
        writer.reads_written(),
        total_samples,
        writer.signal_rows_written()
    );
    Ok(())
}

fn inspect_file(ipath: &str) -> Result<()> {
    let mut reader = BufReader::new(fs::File::open(ipath)?);
    let footer = Footer::read_from(&mut reader)?;
    eprintln!("File identifier: {}", footer.file_identifier);
    eprintln!("Written by: {} (format {})", footer.writing_software, footer.version);
    eprintln!(
        "Signal table: {} bytes at {}",
        footer.signal_table.file_length, footer.signal_table.file_start_offset
    );
    eprintln!(
        "Read table: {} bytes at {}",
        footer.read_table.file_length, footer.read_table.file_start_offset
    );
    Ok(())
}

fn main() -> Result<()> {
    let Some(opath) = std::env::args().nth(1) else {
        bail!("usage: pod5-writer <output.pod5>");
    };

    eprintln!("Writing file {opath}");
    write_file(&opath)?;

    eprintln!("Inspecting file {opath}");
    inspect_file(&opath)?;

    Ok(())
}
