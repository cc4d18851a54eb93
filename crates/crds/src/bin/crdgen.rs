//! Prints the Metalsoft CRDs as a multi-document YAML stream.
//!
//! ```sh
//! cargo run -p crds --bin crdgen > config/crd/bases/metalsoft.yaml
//! ```

use crds::{MetalsoftCluster, MetalsoftClusterTemplate, MetalsoftMachine, MetalsoftMachineTemplate};
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    let crds = [
        MetalsoftCluster::crd(),
        MetalsoftMachine::crd(),
        MetalsoftClusterTemplate::crd(),
        MetalsoftMachineTemplate::crd(),
    ];

    for crd in crds {
        println!("---");
        print!("{}", serde_yaml::to_string(&crd)?);
    }

    Ok(())
}
