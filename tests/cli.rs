// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn slotbrot() -> Command {
    Command::cargo_bin("slotbrot").unwrap()
}

const SMALL: &str = "# a small view\ncols = 24\nrows = 16\nx = -0.5\ny = 0\ndelta = 0.125\ni_max = 100\n";

#[test]
fn renders_a_png() {
    let dir = tempdir().unwrap();
    let params = dir.path().join("fractal.data");
    let output = dir.path().join("buddha.png");
    fs::write(&params, SMALL).unwrap();

    slotbrot()
        .arg("-p")
        .arg(&params)
        .arg("-o")
        .arg(&output)
        .args(&["-n", "2"])
        .assert()
        .success();

    let image = slotbrot::read_image(&output).unwrap();
    assert_eq!((image.cols(), image.rows()), (24, 16));
    assert!(image.cells().iter().all(|c| c.a == 255));
}

#[test]
fn the_size_flag_fills_in_missing_dimensions() {
    let dir = tempdir().unwrap();
    let params = dir.path().join("fractal.data");
    let output = dir.path().join("mandel.png");
    fs::write(&params, "x = -0.5\ny = 0\ndelta = 0.1\ni_max = 50\n").unwrap();

    slotbrot()
        .arg("--params")
        .arg(&params)
        .arg("--output")
        .arg(&output)
        .args(&["--size", "20x10", "--mode", "mandelbrot"])
        .assert()
        .success();

    let image = slotbrot::read_image(&output).unwrap();
    assert_eq!((image.cols(), image.rows()), (20, 10));
    assert!(image.lit_cells() > 0);
}

#[test]
fn the_live_preview_lands_next_to_the_output() {
    let dir = tempdir().unwrap();
    let params = dir.path().join("fractal.data");
    fs::write(&params, SMALL).unwrap();

    slotbrot()
        .arg("-p")
        .arg(&params)
        .arg("-o")
        .arg(dir.path().join("buddha.png"))
        .args(&["-r", "-f", "-n", "1", "--passes", "2"])
        .assert()
        .success();
    assert!(dir.path().join("buddha.png").exists());
}

#[test]
fn without_an_output_nothing_is_written() {
    let dir = tempdir().unwrap();
    let params = dir.path().join("fractal.data");
    fs::write(&params, SMALL).unwrap();

    slotbrot()
        .current_dir(dir.path())
        .args(&["-n", "2"])
        .assert()
        .success();
    let entries = fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(entries, 1);
}

#[test]
fn unknown_keys_fail_the_render() {
    let dir = tempdir().unwrap();
    let params = dir.path().join("fractal.data");
    fs::write(&params, "x = 0\ny = 0\ndelta = 0.1\ni_max = 10\nzoom = 3\n").unwrap();

    slotbrot()
        .arg("-p")
        .arg(&params)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Render failure").and(predicate::str::contains("zoom")));
}

#[test]
fn a_missing_parameter_file_fails() {
    let dir = tempdir().unwrap();
    slotbrot()
        .arg("-p")
        .arg(dir.path().join("nowhere.data"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("nowhere.data"));
}

#[test]
fn bad_arguments_are_refused() {
    slotbrot().args(&["-n", "0"]).assert().failure();
    slotbrot().args(&["--size", "wide"]).assert().failure();
    slotbrot().args(&["--mode", "julia"]).assert().failure();
    slotbrot().args(&["--passes", "65"]).assert().failure();
}
