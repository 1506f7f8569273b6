use vergen_gitcl::{Build, Cargo, Emitter, Gitcl};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let build = Build::builder().build_timestamp(true).build();
    let cargo = Cargo::builder().build();
    let gitcl = Gitcl::builder().branch(true).sha(true).dirty(true).build();

    Emitter::default()
        .add_instructions(&build)?
        .add_instructions(&cargo)?
        .add_instructions(&gitcl)?
        .emit()?;

    // Server and client stubs are both generated: the client is used by the
    // in-process service tests.
    #[cfg(feature = "server")]
    {
        let proto_file = "proto/heimdall.proto";
        println!("cargo:rerun-if-changed={proto_file}");
        tonic_build::configure()
            .build_server(true)
            .build_client(true)
            .compile_protos(&[proto_file], &["proto"])?;
    }

    Ok(())
}
