//! Convert a Gaussian splat PLY file to SPZ
//!
//! Usage: cargo run --example convert_ply_to_spz -- input.ply output.spz

use spz_codec::{CoordinateSystem, PackOptions, UnpackOptions};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let (input, output) = match args.as_slice() {
        [_, input, output] => (input, output),
        _ => {
            eprintln!("Usage: {} <input.ply> <output.spz>", args[0]);
            std::process::exit(1);
        }
    };

    // Keep the cloud in the PLY convention; packing converts it to RUB.
    let mut cloud =
        spz_codec::load_splat_from_ply(input, &UnpackOptions::to_system(CoordinateSystem::RDF))?;
    cloud.antialiased = true;
    println!(
        "Loaded {} gaussians with SH degree {} from {input}",
        cloud.num_points, cloud.sh_degree
    );

    spz_codec::save_spz(
        &cloud,
        &PackOptions::from_system(CoordinateSystem::RDF),
        output,
    )?;

    let check = spz_codec::load_spz(output, &UnpackOptions::to_system(CoordinateSystem::RDF))?;
    if check.num_points != cloud.num_points || check.sh_degree != cloud.sh_degree {
        return Err(format!(
            "{output} read back {} gaussians with SH degree {}",
            check.num_points, check.sh_degree
        )
        .into());
    }

    let in_size = std::fs::metadata(input)?.len();
    let out_size = std::fs::metadata(output)?.len();
    println!(
        "Wrote {output}: {in_size} -> {out_size} bytes ({:.1}x smaller)",
        in_size as f64 / out_size.max(1) as f64
    );

    Ok(())
}
