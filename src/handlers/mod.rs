// Handlers by security tier:
// public (no principal needed) and protected (resolved principal required,
// except mutations, which report Unauthenticated inside their envelope).

pub mod protected;
pub mod public;
