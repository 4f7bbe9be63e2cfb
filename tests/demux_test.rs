use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn write(dir: &std::path::Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

/// S1/S2 -- exact and one-substitution matches both land in the sample that
/// owns the reference barcode `AAAA`.
#[test]
fn exact_and_one_substitution_matches_route_to_the_same_sample() {
    let dir = tempdir().unwrap();
    let fastq = write(
        dir.path(),
        "in.fastq",
        "@read1:AAAA\nGG\n+\nII\n@read2:ACAA\nGG\n+\nII\n",
    );
    let sheet = write(
        dir.path(),
        "sheet.tsv",
        "sample\tbarcode\nsampleA\tAAAA\nsampleC\tCCCC\n",
    );
    let out_dir = dir.path().join("out");

    Command::cargo_bin("bardemux")
        .unwrap()
        .args([
            "demux",
            "--fastq",
            fastq.to_str().unwrap(),
            "--samplesheet",
            sheet.to_str().unwrap(),
            "--output-dir",
            out_dir.to_str().unwrap(),
            "--suffix",
            ".fastq",
            "--barcode-regex",
            r"(.*):(?P<CB>[ATGCN]{4})",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("2\t2\t0\t0"));

    let sample_a = fs::read_to_string(out_dir.join("sampleA.fastq")).unwrap();
    assert!(sample_a.contains("read1:AAAA"));
    assert!(sample_a.contains("read2:ACAA"));
    assert!(!out_dir.join("sampleC.fastq").exists() || fs::read_to_string(out_dir.join("sampleC.fastq")).unwrap().is_empty());
}

/// S3/S4 -- an ambiguous key and a wholly unknown barcode both land in the
/// unmatched sink when one is requested.
#[test]
fn ambiguous_and_unknown_barcodes_land_in_unmatched() {
    let dir = tempdir().unwrap();
    let fastq = write(
        dir.path(),
        "in.fastq",
        "@read3:AATA\nGG\n+\nII\n@read4:TTTT\nGG\n+\nII\n",
    );
    let sheet = write(
        dir.path(),
        "sheet.tsv",
        "sample\tbarcode\nsampleA\tAAAA\nsampleB\tAATA\n",
    );
    let out_dir = dir.path().join("out");

    Command::cargo_bin("bardemux")
        .unwrap()
        .args([
            "demux",
            "--fastq",
            fastq.to_str().unwrap(),
            "--samplesheet",
            sheet.to_str().unwrap(),
            "--output-dir",
            out_dir.to_str().unwrap(),
            "--suffix",
            ".fastq",
            "--write-unmatched",
        ])
        .assert()
        .success();

    let unmatched = fs::read_to_string(out_dir.join("unmatched.fastq")).unwrap();
    assert!(unmatched.contains("read3:AATA"));
    assert!(unmatched.contains("read4:TTTT"));
}

/// S5 -- an empty sequence is dropped unless `--keep-empty` is set.
#[test]
fn empty_sequence_suppressed_unless_keep_empty() {
    let dir = tempdir().unwrap();
    let fastq = write(dir.path(), "in.fastq", "@h:AAAA\n\n+\n\n");
    let sheet = write(dir.path(), "sheet.tsv", "sample\tbarcode\nsampleA\tAAAA\n");
    let out_dir = dir.path().join("out");

    Command::cargo_bin("bardemux")
        .unwrap()
        .args([
            "demux",
            "--fastq",
            fastq.to_str().unwrap(),
            "--samplesheet",
            sheet.to_str().unwrap(),
            "--output-dir",
            out_dir.to_str().unwrap(),
            "--suffix",
            ".fastq",
            "--barcode-regex",
            r"(.*):(?P<CB>[ATGCN]{4})",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("0\t0\t0\t0"));

    let out_dir2 = dir.path().join("out2");
    Command::cargo_bin("bardemux")
        .unwrap()
        .args([
            "demux",
            "--fastq",
            fastq.to_str().unwrap(),
            "--samplesheet",
            sheet.to_str().unwrap(),
            "--output-dir",
            out_dir2.to_str().unwrap(),
            "--suffix",
            ".fastq",
            "--keep-empty",
            "--barcode-regex",
            r"(.*):(?P<CB>[ATGCN]{4})",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("1\t1\t0\t0"));
}

/// A sample sheet mapping two samples to the same barcode is rejected before
/// any FASTQ I/O happens -- no output directory is left behind.
#[test]
fn duplicate_barcodes_in_samplesheet_are_rejected() {
    let dir = tempdir().unwrap();
    let fastq = write(dir.path(), "in.fastq", "@h:AAAA\nGG\n+\nII\n");
    let sheet = write(
        dir.path(),
        "sheet.tsv",
        "sample\tbarcode\nsampleA\tAAAA\nsampleB\tAAAA\n",
    );
    let out_dir = dir.path().join("out");

    Command::cargo_bin("bardemux")
        .unwrap()
        .args([
            "demux",
            "--fastq",
            fastq.to_str().unwrap(),
            "--samplesheet",
            sheet.to_str().unwrap(),
            "--output-dir",
            out_dir.to_str().unwrap(),
        ])
        .assert()
        .failure();

    assert!(!out_dir.join("sampleA.fastq.gz").exists());
}

/// A barcode regex missing the `CB` group is a configuration error, not a
/// panic.
#[test]
fn regex_missing_cb_group_is_a_configuration_error() {
    let dir = tempdir().unwrap();
    let fastq = write(dir.path(), "in.fastq", "@h:AAAA\nGG\n+\nII\n");
    let sheet = write(dir.path(), "sheet.tsv", "sample\tbarcode\nsampleA\tAAAA\n");

    Command::cargo_bin("bardemux")
        .unwrap()
        .args([
            "demux",
            "--fastq",
            fastq.to_str().unwrap(),
            "--samplesheet",
            sheet.to_str().unwrap(),
            "--barcode-regex",
            r"(.*):(?P<WRONG>[ATGCN]{4})",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CB"));
}

/// Gzip-compressed input is transparently decompressed, and a `.gz` suffix
/// produces gzip-compressed output.
#[test]
fn gzip_input_and_output_round_trip() {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let dir = tempdir().unwrap();
    let raw = "@read1:AAAA\nGG\n+\nII\n";
    let gz_path = dir.path().join("in.fastq.gz");
    let mut enc = GzEncoder::new(fs::File::create(&gz_path).unwrap(), Compression::default());
    enc.write_all(raw.as_bytes()).unwrap();
    enc.finish().unwrap();

    let sheet = write(dir.path(), "sheet.tsv", "sample\tbarcode\nsampleA\tAAAA\n");
    let out_dir = dir.path().join("out");

    Command::cargo_bin("bardemux")
        .unwrap()
        .args([
            "demux",
            "--fastq",
            gz_path.to_str().unwrap(),
            "--samplesheet",
            sheet.to_str().unwrap(),
            "--output-dir",
            out_dir.to_str().unwrap(),
            "--barcode-regex",
            r"(.*):(?P<CB>[ATGCN]{4})",
        ])
        .assert()
        .success();

    let mut decoder = flate2::read::GzDecoder::new(
        fs::File::open(out_dir.join("sampleA.fastq.gz")).unwrap(),
    );
    let mut decompressed = String::new();
    std::io::Read::read_to_string(&mut decoder, &mut decompressed).unwrap();
    assert!(decompressed.contains("read1:AAAA"));
}
