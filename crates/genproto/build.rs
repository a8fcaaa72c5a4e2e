use std::fs;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = "src/gen";

    fs::create_dir_all(out_dir)?;

    tonic_prost_build::configure()
        .build_server(true)
        .out_dir(out_dir)
        .compile_protos(
            &[
                "../../proto/common.proto",
                // user proto
                "../../proto/user/common.proto",
                "../../proto/user/query.proto",
                "../../proto/user/command.proto",
                // product proto
                "../../proto/product/common.proto",
                "../../proto/product/query.proto",
                "../../proto/product/command.proto",
                // order proto
                "../../proto/order/common.proto",
                "../../proto/order/query.proto",
                "../../proto/order/command.proto",
                // payment proto
                "../../proto/payment/payment.proto",
            ],
            &["../../proto"],
        )?;

    println!("cargo:rerun-if-changed=../../proto");

    Ok(())
}
