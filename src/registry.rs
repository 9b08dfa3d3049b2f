/// Anything stored in a [`Registry`] carries a stable integer identifier.
pub trait Entity {
    fn id(&self) -> usize;
}

/// Ordered collection of uniquely identified entities.
///
/// Members keep their insertion order. Identifiers handed out by
/// [`Registry::next_id`] grow monotonically for the lifetime of the registry,
/// even across deletions and [`Registry::clear`].
#[derive(Debug, Clone)]
pub struct Registry<T: Entity> {
    members: Vec<T>,
    high_water: usize,
}

impl<T: Entity> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> Registry<T> {
    pub fn new() -> Registry<T> {
        Registry {
            members: Vec::new(),
            high_water: 0,
        }
    }

    /// Appends an entity. Uniqueness is the caller's responsibility.
    pub fn add(&mut self, entity: T) {
        self.high_water = self.high_water.max(entity.id());
        self.members.push(entity);
    }

    /// Finds the position of the entity with the given id
    ///
    /// # Returns
    /// The index into insertion order, or `None` if absent
    pub fn find_by_id(&self, id: usize) -> Option<usize> {
        self.members.iter().position(|m| m.id() == id)
    }

    pub fn contains(&self, id: usize) -> bool {
        self.find_by_id(id).is_some()
    }

    pub fn get(&self, id: usize) -> Option<&T> {
        self.find_by_id(id).map(|i| &self.members[i])
    }

    pub fn get_mut(&mut self, id: usize) -> Option<&mut T> {
        match self.find_by_id(id) {
            Some(i) => Some(&mut self.members[i]),
            None => None,
        }
    }

    /// Removes the entity with the given id. Unknown ids are a no-op.
    pub fn delete_by_id(&mut self, id: usize) -> Option<T> {
        self.find_by_id(id).map(|i| self.members.remove(i))
    }

    /// Keeps only the members matching `keep`, returning the removed ones in
    /// their original order.
    pub fn retain<F>(&mut self, mut keep: F) -> Vec<T>
    where
        F: FnMut(&T) -> bool,
    {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.members.len());
        for member in self.members.drain(..) {
            if keep(&member) {
                kept.push(member);
            } else {
                removed.push(member);
            }
        }
        self.members = kept;
        removed
    }

    /// One past the largest id this registry has ever held
    pub fn next_id(&self) -> usize {
        self.high_water + 1
    }

    pub fn clear(&mut self) {
        self.members.clear();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.members.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.members.iter_mut()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl<'a, T: Entity> IntoIterator for &'a Registry<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.iter()
    }
}
