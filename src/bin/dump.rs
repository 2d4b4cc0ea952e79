//! Pretty-prints the reflected interface of compiled shader modules.

fn main() -> std::io::Result<()> {
    match &std::env::args().collect::<Vec<_>>()[..] {
        [_, files @ ..] if !files.is_empty() => {
            for file in files {
                let bytes = std::fs::read(file)?;
                if bytes.len() % 4 != 0 {
                    eprintln!("{file}: not a multiple of 4 bytes");
                    std::process::exit(1);
                }
                let words: Vec<u32> = bytes
                    .chunks_exact(4)
                    .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                    .collect();

                let info = match spv_interface::reflect(&words) {
                    Ok(info) => info,
                    Err(e) => {
                        eprintln!("{file}: {e}");
                        std::process::exit(1);
                    }
                };

                println!("Information for {file}:\n");
                for set in &info.descriptor_sets {
                    for desc in &set.descriptors {
                        println!(
                            "layout(set = {}, binding = {}) uniform {} : {}",
                            set.set, desc.index, desc.name, desc.ty
                        );
                    }
                }
                for entry in &info.entry_points {
                    println!("\nEntry point {} ({:?}):", entry.name, entry.stage);
                    for input in &entry.inputs {
                        println!(
                            "  layout(location = {}) in {} : {}",
                            input.index, input.name, input.ty
                        );
                    }
                    for output in &entry.outputs {
                        println!(
                            "  layout(location = {}) out {} : {}",
                            output.index, output.name, output.ty
                        );
                    }
                }
                println!();
            }
            Ok(())
        }
        args => {
            eprintln!("Usage: {} FILE.spv...", args.first().map_or("dump", String::as_str));
            std::process::exit(1);
        }
    }
}
