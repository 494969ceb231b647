// Private struct to make Void uninstantiable outside this module. Do not
// instantiate this struct.
#[derive(Debug)]
struct Uninstantiable;

/// A stand-in for the 'never' type `!`, used as the message type of channels
/// that are only ever disconnected.
///
/// This type cannot be instantiated, so a `Sender<Void>` can never send. The
/// thread adapter hands the producer a `Receiver<Void>` as its cancellation
/// signal: dropping the consumer's sender wakes every pending `select!` on it.
#[derive(Debug)]
pub(crate) struct Void(Uninstantiable);
