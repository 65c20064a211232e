pub mod entity {
    /// Student identifier as it appears in the attendance sheet.
    pub type Id = String;
    /// 1-based group number.
    pub type GroupId = usize;
    pub type Count = u32;
    pub type Score = u64;
}


pub mod group {
    use std::collections::HashMap;
    use std::str::FromStr;

    use itertools::Itertools;
    use thiserror::Error;

    use super::entity::{Id, GroupId, Score};
    use super::condition::PairHistory;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Group {
        pub id: GroupId,
        pub size: usize,
    }

    #[derive(Debug, Clone, Error, PartialEq)]
    pub enum LayoutError {
        #[error("Group layout is empty")]
        Empty,
        #[error("Group size must be positive")]
        ZeroSize,
        #[error("Invalid layout entry `{0}`, expected <size>:<count>")]
        InvalidEntry(String),
    }

    /// Groups to fill, numbered from 1 in the order their `(size, count)`
    /// entries were given.
    #[derive(Debug, Clone, PartialEq)]
    pub struct GroupLayout {
        groups: Vec<Group>,
    }

    impl GroupLayout {
        pub fn new(entries: &[(usize, usize)]) -> Result<GroupLayout, LayoutError> {
            if entries.iter().any(|(size, _)| *size == 0) {
                return Err(LayoutError::ZeroSize);
            }
            let groups: Vec<Group> = entries
                .iter()
                .flat_map(|(size, count)| std::iter::repeat(*size).take(*count))
                .enumerate()
                .map(|(index, size)| Group { id: index + 1, size })
                .collect();
            if groups.is_empty() {
                return Err(LayoutError::Empty);
            }
            Ok(GroupLayout { groups })
        }

        pub fn groups(&self) -> &[Group] {
            &self.groups
        }

        pub fn get(&self, id: GroupId) -> Option<&Group> {
            id.checked_sub(1).and_then(|index| self.groups.get(index))
        }

        pub fn capacity(&self) -> usize {
            self.groups.iter().map(|group| group.size).sum()
        }
    }

    impl FromStr for GroupLayout {
        type Err = LayoutError;

        /// Parses `size:count[,size:count...]`, e.g. `2:5` or `3:2,4:1`.
        fn from_str(s: &str) -> Result<Self, Self::Err> {
            let entries = s
                .split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(|entry| {
                    let (size, count) = entry
                        .split_once(':')
                        .ok_or_else(|| LayoutError::InvalidEntry(entry.to_string()))?;
                    let size = size.trim().parse::<usize>()
                        .map_err(|_| LayoutError::InvalidEntry(entry.to_string()))?;
                    let count = count.trim().parse::<usize>()
                        .map_err(|_| LayoutError::InvalidEntry(entry.to_string()))?;
                    Ok((size, count))
                })
                .collect::<Result<Vec<_>, LayoutError>>()?;
            GroupLayout::new(&entries)
        }
    }

    #[derive(Debug, Clone, Error, PartialEq)]
    pub enum AssignmentError {
        #[error("Group {0} is not part of the layout")]
        UnknownGroup(GroupId),
        #[error("Student `{0}` is not expected in this session")]
        UnknownStudent(Id),
        #[error("Student `{0}` is not assigned to any group")]
        Unassigned(Id),
        #[error("Student `{0}` is assigned more than once")]
        AssignedTwice(Id),
        #[error("Group {group} has {actual} students, expected {expected}")]
        WrongSize { group: GroupId, expected: usize, actual: usize },
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct Roster {
        pub group: Group,
        pub members: Vec<Id>,
    }

    impl Roster {
        /// Every member pays its diagonal term; every pair of members pays
        /// both orientations.
        pub fn calc_score(&self, history: &PairHistory) -> Score {
            let own: Score = self.members.iter()
                .map(|member| history.penalty([member.as_str(), member.as_str()]))
                .sum();
            let shared: Score = self.members.iter().combinations(2).map(|pair| {
                history.penalty([pair[0].as_str(), pair[1].as_str()])
            }).sum();
            own + shared
        }
    }

    /// One roster per group of the layout, in group order.
    #[derive(Debug, Clone, PartialEq)]
    pub struct Assignment {
        rosters: Vec<Roster>,
    }

    impl Assignment {
        /// Members keep the order in which they are given.
        pub fn from_members<I>(layout: &GroupLayout, members: I) -> Result<Assignment, AssignmentError>
        where
            I: IntoIterator<Item = (Id, GroupId)>,
        {
            let mut rosters: Vec<Roster> = layout.groups()
                .iter()
                .map(|group| Roster { group: *group, members: Vec::new() })
                .collect();
            for (student, group_id) in members {
                let roster = group_id.checked_sub(1)
                    .and_then(|index| rosters.get_mut(index))
                    .ok_or(AssignmentError::UnknownGroup(group_id))?;
                roster.members.push(student);
            }
            Ok(Assignment { rosters })
        }

        pub fn rosters(&self) -> &[Roster] {
            &self.rosters
        }

        pub fn group_of(&self, student: &str) -> Option<GroupId> {
            self.rosters.iter()
                .find(|roster| roster.members.iter().any(|member| member == student))
                .map(|roster| roster.group.id)
        }

        /// Checks that every expected student sits in exactly one group and
        /// that every group holds exactly its size.
        pub fn validate(&self, students: &[Id]) -> Result<(), AssignmentError> {
            let mut seen: HashMap<&str, usize> = students.iter().map(|s| (s.as_str(), 0)).collect();
            for member in self.rosters.iter().flat_map(|roster| roster.members.iter()) {
                let count = seen.get_mut(member.as_str())
                    .ok_or_else(|| AssignmentError::UnknownStudent(member.clone()))?;
                *count += 1;
                if *count > 1 {
                    return Err(AssignmentError::AssignedTwice(member.clone()));
                }
            }
            if let Some(missing) = students.iter().find(|s| seen[s.as_str()] == 0) {
                return Err(AssignmentError::Unassigned(missing.clone()));
            }
            for roster in &self.rosters {
                if roster.members.len() != roster.group.size {
                    return Err(AssignmentError::WrongSize {
                        group: roster.group.id,
                        expected: roster.group.size,
                        actual: roster.members.len(),
                    });
                }
            }
            Ok(())
        }

        /// Sum of squared historical counts over every ordered pair of
        /// students sharing a group, each student paired with itself included.
        pub fn score(&self, history: &PairHistory) -> Score {
            self.rosters.iter().map(|roster| roster.calc_score(history)).sum()
        }

        /// Ordered pairs of distinct students sharing a group.
        pub fn colocated_pairs(&self) -> impl Iterator<Item = (&Id, &Id)> + '_ {
            self.rosters.iter().flat_map(|roster| {
                roster.members.iter()
                    .cartesian_product(roster.members.iter())
                    .filter(|(a, b)| a != b)
            })
        }
    }
}

pub mod condition {
    use std::collections::HashMap;
    use super::entity::{Id, Count, Score};

    /// Prior co-assignment counts as read from the pairing matrix: one count
    /// per ordered `(row, column)` pair, the diagonal included.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct PairHistory {
        counts: HashMap<(Id, Id), Count>,
    }

    impl PairHistory {
        pub fn new() -> PairHistory {
            PairHistory { counts: HashMap::new() }
        }

        pub fn get(&self, from: &str, to: &str) -> Count {
            self.counts.get(&(from.to_string(), to.to_string())).copied().unwrap_or(0)
        }

        /// A zero count forgets the cell.
        pub fn set(&mut self, from: &str, to: &str, count: Count) {
            let key = (from.to_string(), to.to_string());
            if count == 0 {
                self.counts.remove(&key);
            } else {
                self.counts.insert(key, count);
            }
        }

        /// Sets both orientations of a pair.
        pub fn set_pair(&mut self, ids: [&str; 2], count: Count) {
            let [a, b] = ids;
            self.set(a, b, count);
            self.set(b, a, count);
        }

        /// One more shared session in both orientations. Self pairs are ignored.
        pub fn record(&mut self, ids: [&str; 2]) {
            let [a, b] = ids;
            if a == b {
                return;
            }
            self.set(a, b, self.get(a, b) + 1);
            self.set(b, a, self.get(b, a) + 1);
        }

        /// Cost of `a` and `b` sharing a group: the squared count of each
        /// orientation. For `a == b` this is the diagonal term alone.
        pub fn penalty(&self, ids: [&str; 2]) -> Score {
            let [a, b] = ids;
            let square = |count: Count| Score::from(count) * Score::from(count);
            if a == b {
                square(self.get(a, a))
            } else {
                square(self.get(a, b)) + square(self.get(b, a))
            }
        }

        /// Cells with a positive count.
        pub fn entries(&self) -> impl Iterator<Item = ([&str; 2], Count)> + '_ {
            self.counts.iter().map(|((a, b), count)| ([a.as_str(), b.as_str()], *count))
        }
    }
}
