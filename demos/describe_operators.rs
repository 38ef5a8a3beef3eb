//! Print the documentation of every registered operator kind, then build a
//! FullyConnected node and report what each execution context yields.

use operator_registry::{bootstrap, params::kwargs, ExecutionContext};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let registry = bootstrap()?;

    for doc in registry.describe_all() {
        println!("{}", doc.description);
        println!("arguments: {:?}\n", doc.arguments);
    }

    let property = registry.create_property(
        "FullyConnected",
        &kwargs([("hidden_units", "128"), ("bias", "true")]),
    )?;
    let shapes = property.infer_shape(&[Some(vec![32, 64])])?;
    println!("FullyConnected (32, 64) -> {:?}", shapes.outputs[0]);

    for ctx in ["cpu", "cpu_pinned", "gpu(0)"] {
        let ctx: ExecutionContext = ctx.parse()?;
        match property.create_operator(ctx) {
            Ok(op) => println!("{}: {:?}", ctx, op),
            Err(e) => println!("{}: {}", ctx, e),
        }
    }

    println!("\n{}", registry.describe("FullyConnected")?.to_json()?);
    Ok(())
}
