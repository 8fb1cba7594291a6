use bitflags::bitflags;

bitflags! {
    /// Segments present in an Updates message.
    ///
    /// Declaration order is the wire order. The last set segment is written
    /// without a count and runs to the end of the message.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct UpdateFlags: u8 {
        const MAPPINGS = 0b0000_0001;
        const DESPAWNS = 0b0000_0010;
        const REMOVALS = 0b0000_0100;
        const CHANGES = 0b0000_1000;
    }
}

impl UpdateFlags {
    pub fn has_flag(self, flag: UpdateFlags) -> bool {
        self.contains(flag)
    }

    pub fn add_flag(&mut self, flag: UpdateFlags) {
        self.insert(flag);
    }

    pub fn remove_flag(&mut self, flag: UpdateFlags) {
        self.remove(flag);
    }

    /// Set segments in wire order.
    pub fn set_flags(self) -> impl Iterator<Item = UpdateFlags> {
        self.iter()
    }

    /// Last set segment in wire order, or an empty set if none are set.
    pub fn last_flag(self) -> UpdateFlags {
        self.iter().last().unwrap_or_else(UpdateFlags::empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_flags_order() {
        let flags = UpdateFlags::CHANGES | UpdateFlags::MAPPINGS | UpdateFlags::REMOVALS;

        let set: Vec<_> = flags.set_flags().collect();
        assert_eq!(
            set,
            vec![UpdateFlags::MAPPINGS, UpdateFlags::REMOVALS, UpdateFlags::CHANGES]
        );
        assert_eq!(flags.last_flag(), UpdateFlags::CHANGES);
    }

    #[test]
    fn test_last_flag_none_set() {
        assert_eq!(UpdateFlags::empty().last_flag(), UpdateFlags::empty());
        assert_eq!(UpdateFlags::default(), UpdateFlags::empty());
    }

    #[test]
    fn test_add_remove() {
        let mut flags = UpdateFlags::empty();
        flags.add_flag(UpdateFlags::DESPAWNS);
        flags.add_flag(UpdateFlags::REMOVALS);
        assert!(flags.has_flag(UpdateFlags::DESPAWNS));

        flags.remove_flag(UpdateFlags::REMOVALS);
        assert!(!flags.has_flag(UpdateFlags::REMOVALS));
        assert_eq!(flags.last_flag(), UpdateFlags::DESPAWNS);
        assert_eq!(flags.bits(), 0b0010);
    }

    #[test]
    fn test_unknown_bits_rejected() {
        assert!(UpdateFlags::from_bits(0b0001_0000).is_none());
        assert_eq!(UpdateFlags::from_bits(0b1111), Some(UpdateFlags::all()));
    }
}
