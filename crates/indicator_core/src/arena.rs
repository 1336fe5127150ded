use crate::icon::IconDescriptor;

/// Stable handle to an icon owned by an [`IconArena`].
///
/// Handles carry a generation, so a handle to an icon that was unregistered
/// never resolves to a later icon that reuses the same slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct IconHandle {
    index: u32,
    generation: u32,
}

impl std::fmt::Debug for IconHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "IconHandle({}v{})", self.index, self.generation)
    }
}

impl std::fmt::Display for IconHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "icon #{} (generation {})", self.index, self.generation)
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    icon: Option<IconDescriptor>,
}

#[derive(Debug, Default)]
pub struct IconArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl IconArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, icon: IconDescriptor) -> IconHandle {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.icon = Some(icon);
                IconHandle { index, generation: slot.generation }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot { generation: 0, icon: Some(icon) });
                IconHandle { index, generation: 0 }
            }
        }
    }

    pub fn remove(&mut self, handle: IconHandle) -> Option<IconDescriptor> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let icon = slot.icon.take()?;
        match slot.generation.checked_add(1) {
            Some(generation) => {
                slot.generation = generation;
                self.free.push(handle.index);
            }
            // out of generations, the slot is retired so old handles stay dead
            None => log::debug!("Retiring arena slot {}", handle.index),
        }
        Some(icon)
    }

    pub fn get(&self, handle: IconHandle) -> Option<&IconDescriptor> {
        self.slots.get(handle.index as usize).filter(|slot| slot.generation == handle.generation)?.icon.as_ref()
    }

    pub fn get_mut(&mut self, handle: IconHandle) -> Option<&mut IconDescriptor> {
        self.slots.get_mut(handle.index as usize).filter(|slot| slot.generation == handle.generation)?.icon.as_mut()
    }

    pub fn contains(&self, handle: IconHandle) -> bool {
        self.get(handle).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (IconHandle, &IconDescriptor)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.icon.as_ref().map(|icon| (IconHandle { index: index as u32, generation: slot.generation }, icon))
        })
    }

    pub fn find_by_name(&self, name: &str) -> Option<IconHandle> {
        self.iter().find(|(_, icon)| icon.name.as_str() == name).map(|(handle, _)| handle)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.icon.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
