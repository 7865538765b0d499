pub mod mac;
pub mod scenario;
pub mod sim;

#[cfg(test)]
mod test;
