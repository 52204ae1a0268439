use anyhow::Result;
use msync_audit::{verify_hash_chain, VerifyResult};

pub fn verify(path: &str) -> Result<()> {
    match verify_hash_chain(path)? {
        VerifyResult::Valid { lines } => {
            println!("audit_valid=true lines={lines}");
            Ok(())
        }
        VerifyResult::Broken { line, reason } => {
            println!("audit_valid=false line={line}");
            anyhow::bail!("audit chain broken at line {line}: {reason}")
        }
    }
}
