use anyhow::Result;
use autooff_license::LicenseServer;

pub fn execute(port: u16) -> Result<()> {
    let runtime = super::runtime()?;
    runtime.block_on(async {
        println!("💳 Demo license server on http://127.0.0.1:{}", port);
        println!("   Press Ctrl+C to stop");
        LicenseServer::new(port).run().await
    })?;
    Ok(())
}
