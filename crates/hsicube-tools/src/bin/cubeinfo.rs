use std::path::Path;
use std::process;

use hsicube::{FileType, HierarchicalOptions, ImageHandle};

fn usage() -> ! {
    eprintln!("Usage: cubeinfo [--hierarchical] [--ancillary] <cube-file>");
    eprintln!();
    eprintln!("Prints geometry and metadata for a hyperspectral cube.");
    eprintln!("Flat binary cubes need a sibling .hdr header; container files");
    eprintln!("(.h5/.hdf5) are detected by extension or forced with --hierarchical.");
    process::exit(2);
}

fn is_container_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("h5") | Some("hdf") | Some("hdf5")
    )
}

fn format_handle(handle: &ImageHandle) -> String {
    let mut out = String::new();
    out.push_str(&format!("File: {}\n", handle.path().display()));
    out.push_str(&format!("Format: {}\n", handle.file_type()));
    let (lines, columns, bands) = handle.shape();
    out.push_str(&format!(
        "Dimensions: {lines} lines x {columns} columns x {bands} bands\n"
    ));
    out.push_str(&format!("Element type: {}\n", handle.dtype()));

    if let Some(geometry) = handle.geometry() {
        out.push_str(&format!("Interleave: {}\n", geometry.interleave));
        out.push_str(&format!("Byte order: {}\n", geometry.byte_order));
        if geometry.offset > 0 {
            out.push_str(&format!("Header offset: {} bytes\n", geometry.offset));
        }
    }

    match handle.wavelengths() {
        Some(wavelengths) if !wavelengths.is_empty() => {
            let min = wavelengths.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = wavelengths
                .iter()
                .cloned()
                .fold(f64::NEG_INFINITY, f64::max);
            let units = handle.wavelength_units().unwrap_or("unspecified units");
            out.push_str(&format!("Spectral range: {min} - {max} ({units})\n"));
        }
        _ => out.push_str("Spectral range: no wavelength metadata\n"),
    }

    if let Some(mask) = handle.bad_bands() {
        let usable = mask.iter().filter(|&&good| good).count();
        out.push_str(&format!("Usable bands: {usable} of {}\n", mask.len()));
    }
    if let Some(no_data) = handle.no_data() {
        out.push_str(&format!("No-data value: {no_data}\n"));
    }
    if let Some(map_info) = handle.map_info() {
        out.push_str(&format!("Map info: {map_info}\n"));
    }
    if let Some(ancillary) = handle.ancillary() {
        let layers = if ancillary.path_length.is_some() { 7 } else { 6 };
        out.push_str(&format!("Ancillary layers: {layers}\n"));
    }
    out
}

fn main() {
    env_logger::init();

    let mut hierarchical = false;
    let mut ancillary = false;
    let mut path: Option<String> = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--hierarchical" => hierarchical = true,
            "--ancillary" => ancillary = true,
            "--help" | "-h" => usage(),
            other if other.starts_with('-') => {
                eprintln!("Unknown option: {other}");
                usage();
            }
            other => {
                if path.replace(String::from(other)).is_some() {
                    usage();
                }
            }
        }
    }
    let Some(path) = path else { usage() };
    let path = Path::new(&path);

    let result = if hierarchical || is_container_path(path) {
        let options = HierarchicalOptions {
            load_ancillary: ancillary,
            ..Default::default()
        };
        ImageHandle::open_hierarchical(path, options)
    } else {
        ImageHandle::open_flat(path)
    };

    match result {
        Ok(handle) => {
            if ancillary && handle.file_type() == FileType::Flat {
                eprintln!("Note: --ancillary applies to container files; use load_observables for flat cubes");
            }
            print!("{}", format_handle(&handle));
        }
        Err(error) => {
            eprintln!("Error: {error}");
            process::exit(1);
        }
    }
}
