use std::{env, path::PathBuf};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let proto_root = manifest_dir.join("proto");
    let proto_file = proto_root.join("raid/v1/block.proto");

    println!("cargo:rerun-if-changed={}", proto_file.display());

    // Ensure a protoc is available even on hosts without one installed.
    if env::var_os("PROTOC").is_none() {
        let protoc_path = protoc_bin_vendored::protoc_bin_path()?;
        // SAFETY: build scripts run single-threaded before any other code observes the env.
        unsafe {
            env::set_var("PROTOC", protoc_path);
        }
    }

    tonic_prost_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&[proto_file], &[proto_root])?;

    Ok(())
}
