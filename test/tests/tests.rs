mod deployer;
mod fixtures;
mod sdk;
