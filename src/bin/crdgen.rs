//! Print the reflected CustomResourceDefinitions as a multi-document YAML stream.
//!
//! Usage: `cargo run --bin crdgen > deploy/crds.yaml`

use kube::CustomResourceExt;

use gameserver_operator::crd::{ComputeInstance, ProxyInstance};

fn main() -> Result<(), serde_yaml::Error> {
    let crds = [ComputeInstance::crd(), ProxyInstance::crd()];
    for crd in &crds {
        println!("---");
        print!("{}", serde_yaml::to_string(crd)?);
    }
    Ok(())
}
