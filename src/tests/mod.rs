#[cfg(test)]
mod common;

#[cfg(test)]
mod prover_test;

#[cfg(test)]
mod driver_test;
