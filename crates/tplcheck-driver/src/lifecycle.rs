use std::future::Future;

use tracing::{info, warn};

use crate::error::DriverError;
use crate::terraform::{TerraformOutputs, TerraformRunner, Workspace};

/// Value produced by the body of [`with_provisioned`], together with the
/// outcome of the destroy that followed it.
#[derive(Debug)]
pub struct Provisioned<T> {
    pub value: T,
    pub teardown: Result<(), DriverError>,
}

/// Apply `workspace`, hand its outputs to `body`, then destroy.
///
/// Destroy runs exactly once on every path out of this function:
/// - init/apply or output reading fails: destroy runs, the provisioning
///   error is returned and any destroy error is logged;
/// - `body` completes: destroy runs and its result is returned in
///   [`Provisioned::teardown`];
/// - `body` panics: destroy runs, then the panic is resumed.
///
/// `body` runs on its own task so a panic inside it cannot skip the destroy.
pub async fn with_provisioned<F, Fut, T>(
    runner: &TerraformRunner,
    workspace: Workspace,
    body: F,
) -> Result<Provisioned<T>, DriverError>
where
    F: FnOnce(TerraformOutputs) -> Fut,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let applied = async {
        runner.init_and_apply(&workspace).await?;
        runner.outputs(&workspace).await
    }
    .await;

    let outputs = match applied {
        Ok(outputs) => outputs,
        Err(e) => {
            if let Err(teardown) = runner.destroy(&workspace).await {
                warn!(run_id = %workspace.run_id, error = %teardown, "destroy after failed apply also failed");
            }
            return Err(e);
        }
    };

    info!(run_id = %workspace.run_id, outputs = ?outputs.names(), "provisioned; running checks");
    let joined = tokio::spawn(body(outputs)).await;

    let teardown = runner.destroy(&workspace).await;
    if let Err(e) = &teardown {
        warn!(run_id = %workspace.run_id, error = %e, "destroy failed; resources may be orphaned");
    }

    match joined {
        Ok(value) => Ok(Provisioned { value, teardown }),
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => Err(DriverError::Internal(format!("check task cancelled: {}", e))),
    }
}
