pub mod azure_devops;
